use fizzle::graphics::HeadlessGraphics;
use fizzle::meshes::{create_cube, cube_mesh};
use fizzle::renderable::SceneError;
use fizzle::shader::ShaderProgram;
use fizzle::{MeshData, MeshError, Renderable, Scene};
use nalgebra::{Point3, Vector3, Vector4};
use std::rc::Rc;

const VS: &str = "uniform mat4 MVP_MATRIX; in vec3 VERTEX_POSITION; void main() {}";
const FS: &str = "uniform vec4 MATERIAL_DIFFUSE; void main() {}";

#[test]
fn child_transform_composes_parent_translation() {
    let mut scene = Scene::new();
    let parent = scene.insert(Renderable::new_group());
    let child = scene.insert(Renderable::new_group());
    scene.get_mut(parent).unwrap().location = Vector3::new(1.0, 2.0, 3.0);
    scene.get_mut(child).unwrap().location = Vector3::new(4.0, 5.0, 6.0);
    scene.add_child(parent, child).unwrap();

    let root = scene.transform_mat4(parent).unwrap();
    assert_eq!(root, scene.get(parent).unwrap().local_transform_mat4());

    let world = scene.transform_mat4(child).unwrap();
    let origin = world.transform_point(&Point3::origin());
    assert_eq!(origin.coords, Vector3::new(5.0, 7.0, 9.0));
}

#[test]
fn reparenting_into_own_subtree_is_rejected() {
    let mut scene = Scene::new();
    let a = scene.insert(Renderable::new_group());
    let b = scene.insert(Renderable::new_group());
    scene.add_child(a, b).unwrap();

    assert!(matches!(scene.add_child(b, a), Err(SceneError::Cycle { .. })));
    assert!(matches!(scene.add_child(a, a), Err(SceneError::Cycle { .. })));
    assert_eq!(scene.get(a).unwrap().children(), &[b]);
    assert_eq!(scene.roots().collect::<Vec<_>>(), vec![a]);
}

#[test]
fn clones_copy_transforms_and_share_cores() {
    let gfx = HeadlessGraphics::new();
    let mut scene = Scene::new();
    let original = scene.insert(create_cube(&gfx, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0).unwrap());
    let copy = scene.clone_renderable(original).unwrap();

    scene.get_mut(copy).unwrap().location.x = 10.0;
    assert_eq!(scene.get(original).unwrap().location.x, 0.0);
    scene.get_mut(original).unwrap().location.y = -3.0;
    assert_eq!(scene.get(copy).unwrap().location.y, 0.0);

    let shader = Rc::new(ShaderProgram::from_sources(&gfx, "plain", VS, FS).unwrap());
    scene.get(copy).unwrap().core.as_ref().unwrap().borrow_mut().shader = Some(shader.clone());
    let seen = scene.get(original).unwrap().core.as_ref().unwrap().borrow().shader.clone();
    assert!(Rc::ptr_eq(&seen.unwrap(), &shader));

    let red = Vector4::new(1.0, 0.0, 0.0, 1.0);
    scene.get(original).unwrap().core.as_ref().unwrap().borrow_mut().material.diffuse_color = red;
    let copied = scene.get(copy).unwrap().core.as_ref().unwrap().borrow().material.diffuse_color;
    assert_eq!(copied, red);

    assert!(scene.get(original).unwrap().shares_core_with(scene.get(copy).unwrap()));
}

#[test]
fn clones_copy_the_whole_subtree() {
    let gfx = HeadlessGraphics::new();
    let mut scene = Scene::new();
    let root = scene.insert(Renderable::new_group());
    let leaf = scene.insert(create_cube(&gfx, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0).unwrap());
    scene.add_child(root, leaf).unwrap();

    let copy = scene.clone_renderable(root).unwrap();
    let copied_leaf = scene.get(copy).unwrap().children()[0];

    assert_ne!(copied_leaf, leaf);
    assert_eq!(scene.get(copied_leaf).unwrap().parent(), Some(copy));
    assert_eq!(scene.subtree(copy).len(), 2);
    assert_eq!(scene.len(), 4);
}

#[test]
fn shared_core_is_released_by_its_last_holder() {
    let gfx = HeadlessGraphics::new();
    let mut scene = Scene::new();
    let original = scene.insert(create_cube(&gfx, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0).unwrap());
    let copy = scene.clone_renderable(original).unwrap();
    let buffers = gfx.live_buffers();
    assert!(buffers > 0);

    scene.destroy(&gfx, copy);
    assert_eq!(gfx.live_buffers(), buffers);
    assert!(
        scene.get(original).unwrap().core.as_ref().unwrap().borrow().is_drawable()
    );

    scene.destroy(&gfx, original);
    assert_eq!(gfx.live_buffers(), 0);
    assert_eq!(gfx.live_vertex_arrays(), 0);
    assert!(scene.is_empty());
}

#[test]
fn destroying_a_core_empties_it_for_everyone() {
    let gfx = HeadlessGraphics::new();
    let mut scene = Scene::new();
    let original = scene.insert(create_cube(&gfx, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0).unwrap());
    let copy = scene.clone_renderable(original).unwrap();

    scene.get_mut(original).unwrap().destroy_core(&gfx);

    assert!(scene.get(original).unwrap().core.is_none());
    assert!(!scene.get(copy).unwrap().core.as_ref().unwrap().borrow().is_drawable());
    assert_eq!(gfx.live_buffers(), 0);
}

#[test]
fn uploading_into_a_destroyed_core_is_refused() {
    let gfx = HeadlessGraphics::new();
    let mut scene = Scene::new();
    let original = scene.insert(create_cube(&gfx, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0).unwrap());
    let copy = scene.clone_renderable(original).unwrap();
    scene.get_mut(original).unwrap().destroy_core(&gfx);

    let core = scene.get(copy).unwrap().core.clone().unwrap();
    let result = cube_mesh(0.0, 0.0, 0.0, 1.0, 1.0, 1.0).upload(&gfx, &mut core.borrow_mut());

    assert!(matches!(result, Err(MeshError::Destroyed)));
    assert!(!core.borrow().is_drawable());
    assert_eq!(gfx.live_buffers(), 0);
}

#[test]
fn map_visits_the_subtree_in_pre_order() {
    let mut scene = Scene::new();
    let root = scene.insert(Renderable::new_group());
    let a = scene.insert(Renderable::new_group());
    let b = scene.insert(Renderable::new_group());
    let c = scene.insert(Renderable::new_group());
    let outside = scene.insert(Renderable::new_group());
    scene.add_child(root, a).unwrap();
    scene.add_child(root, b).unwrap();
    scene.add_child(a, c).unwrap();

    let mut visited = Vec::new();
    scene.map(root, |id, node| {
        visited.push(id);
        node.is_visible = false;
    });

    assert_eq!(visited, vec![root, a, c, b]);
    assert!([root, a, b, c].iter().all(|&id| !scene.get(id).unwrap().is_visible));
    assert!(scene.get(outside).unwrap().is_visible);
}

#[test]
fn world_bounds_follow_the_parent_chain() {
    let gfx = HeadlessGraphics::new();
    let mut scene = Scene::new();
    let parent = scene.insert(Renderable::new_group());
    let cube = scene.insert(create_cube(&gfx, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0).unwrap());
    scene.get_mut(parent).unwrap().location = Vector3::new(10.0, 0.0, 0.0);
    scene.get_mut(cube).unwrap().scale = Vector3::repeat(2.0);
    scene.add_child(parent, cube).unwrap();

    let bounds = scene.world_bounds(cube).unwrap();

    assert_eq!(bounds.bottom_left, Vector3::new(8.0, -2.0, -2.0));
    assert_eq!(bounds.top_right, Vector3::new(12.0, 2.0, 2.0));
    assert!(scene.world_bounds(parent).unwrap().is_empty());
}

fn triangle() -> MeshData {
    MeshData {
        positions: vec![Vector3::zeros(), Vector3::x(), Vector3::y()],
        indices: vec![0, 1, 2],
        ..MeshData::default()
    }
}

#[test]
fn validation_rejects_empty_meshes() {
    assert!(triangle().validate().is_ok());
    assert!(matches!(MeshData::default().validate(), Err(MeshError::Empty)));

    let no_indices = MeshData {
        indices: Vec::new(),
        ..triangle()
    };
    assert!(matches!(no_indices.validate(), Err(MeshError::Empty)));
}

#[test]
fn validation_rejects_mismatched_attributes() {
    let mesh = MeshData {
        normals: vec![Vector3::z(); 2],
        ..triangle()
    };

    assert!(matches!(
        mesh.validate(),
        Err(MeshError::AttributeLength {
            attribute: "normals",
            expected: 3,
            actual: 2,
        })
    ));
}

#[test]
fn validation_rejects_out_of_range_indices() {
    let mesh = MeshData {
        indices: vec![0, 1, 3],
        ..triangle()
    };

    assert!(matches!(
        mesh.validate(),
        Err(MeshError::IndexOutOfRange {
            index: 3,
            vertices: 3,
        })
    ));
}

#[test]
fn validation_rejects_non_finite_values() {
    let mesh = MeshData {
        normals: vec![Vector3::z(), Vector3::repeat(f32::NAN), Vector3::z()],
        ..triangle()
    };
    assert!(matches!(
        mesh.validate(),
        Err(MeshError::NonFinite {
            attribute: "normals"
        })
    ));

    let gfx = HeadlessGraphics::new();
    assert!(Renderable::from_mesh(&gfx, &mesh).is_err());
    assert_eq!(gfx.live_buffers(), 0);
    assert_eq!(gfx.live_vertex_arrays(), 0);
}
