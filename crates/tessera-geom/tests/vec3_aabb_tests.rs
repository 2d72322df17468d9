use tessera_geom::{Aabb, Sphere, Vec3};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn vec3_approx_eq(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps) && approx_eq(a.z, b.z, eps)
}

#[test]
fn vec3_constants() {
    assert!(vec3_approx_eq(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.0), 1e-6));
    assert!(vec3_approx_eq(Vec3::UP, Vec3::new(0.0, 1.0, 0.0), 1e-6));
    assert!(vec3_approx_eq(Vec3::splat(2.0), Vec3::new(2.0, 2.0, 2.0), 1e-6));
}

#[test]
fn vec3_add_sub_neg() {
    let a = Vec3::new(1.0, 2.0, 3.0);
    let b = Vec3::new(-4.0, 5.0, -6.0);
    let c = a + b;
    assert!(vec3_approx_eq(c, Vec3::new(-3.0, 7.0, -3.0), 1e-6));
    assert!(vec3_approx_eq(c - a, b, 1e-6));
    assert!(vec3_approx_eq(-a, Vec3::new(-1.0, -2.0, -3.0), 1e-6));
}

#[test]
fn vec3_dot_length_normalized() {
    let v = Vec3::new(3.0, 4.0, 0.0);
    assert!(approx_eq(v.dot(v), 25.0, 1e-6));
    assert!(approx_eq(v.length(), 5.0, 1e-6));
    assert!(approx_eq(v.distance(Vec3::ZERO), 5.0, 1e-6));

    let n = v.normalized();
    assert!(vec3_approx_eq(n, Vec3::new(0.6, 0.8, 0.0), 1e-6));

    // Zero vector normalization should be a no-op (not NaN, unchanged)
    assert!(vec3_approx_eq(Vec3::ZERO.normalized(), Vec3::ZERO, 1e-6));
}

#[test]
fn vec3_angle() {
    let x = Vec3::new(1.0, 0.0, 0.0);
    let y = Vec3::new(0.0, 2.0, 0.0);
    assert!(approx_eq(x.angle_deg(y), 90.0, 1e-3));
    assert!(approx_eq(x.angle_deg(x * 3.0), 0.0, 1e-3));
    assert!(approx_eq(x.angle_deg(Vec3::ZERO), 0.0, 1e-6));
}

#[test]
fn aabb_center_contains_include() {
    let mut aabb = Aabb::new(Vec3::new(-1.0, 0.0, 1.0), Vec3::new(1.0, 2.0, 3.0));
    assert!(vec3_approx_eq(aabb.center(), Vec3::new(0.0, 1.0, 2.0), 1e-6));
    assert!(aabb.contains(Vec3::new(0.0, 1.0, 2.0)));
    assert!(!aabb.contains(Vec3::new(0.0, 3.0, 2.0)));
    aabb.include(Vec3::new(0.0, 3.0, 2.0));
    assert!(aabb.contains(Vec3::new(0.0, 3.0, 2.0)));
}

#[test]
fn aabb_ray_hits_and_misses() {
    let aabb = Aabb::new(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
    let hit = aabb.ray_intersection(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 100.0);
    assert!(approx_eq(hit.unwrap(), 4.0, 1e-5));

    // Pointing away
    assert!(aabb.ray_intersection(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0), 100.0).is_none());
    // Too short
    assert!(aabb.ray_intersection(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 3.0).is_none());
    // Parallel outside the slab
    assert!(aabb.ray_intersection(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 100.0).is_none());
    // Starting inside
    let inside = aabb.ray_intersection(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 100.0);
    assert!(approx_eq(inside.unwrap(), 0.0, 1e-6));
}

#[test]
fn sphere_enclosing_and_axis_offsets() {
    let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
    let s = Sphere::enclosing(&aabb);
    assert!(vec3_approx_eq(s.center, Vec3::splat(1.0), 1e-6));
    assert!(approx_eq(s.radius, 3.0f32.sqrt(), 1e-5));

    let (perp, along) = s.axis_offsets(Vec3::new(1.0, 1.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
    assert!(approx_eq(perp, 0.0, 1e-6));
    assert!(approx_eq(along, 6.0, 1e-6));
}
