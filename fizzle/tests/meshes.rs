use fizzle::BoundingRect;
use fizzle::graphics::{
    DataType, DrawMode, GraphicsProvider, HeadlessGraphics, UniformValue, mat4_to_array,
};
use fizzle::meshes::{create_cube, create_wire_cube, cube_mesh};
use fizzle::renderable::{Bone, Skeleton};
use fizzle::shader::ShaderProgram;
use fizzle::{DrawView, ForwardRenderer, Renderable, Renderer, Scene};
use nalgebra::{Matrix4, Vector3};
use std::rc::Rc;

const VS: &str = "uniform mat4 MVP_MATRIX;
    in vec3 VERTEX_POSITION;
    in vec3 VERTEX_NORMAL;
    in vec2 VERTEX_UV_0;
    in vec3 VERTEX_TANGENT;
    void main() {}";
const FS: &str = "void main() {}";

#[test]
fn cube_has_unshared_faces() {
    let gfx = HeadlessGraphics::new();
    let cube = create_cube(&gfx, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0).unwrap();
    let mesh = cube_mesh(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0);

    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.indices.len(), 36);
    assert_eq!(cube.face_count, 12);
    assert_eq!(cube.core.as_ref().unwrap().borrow().element_count, 36);
    assert_eq!(
        cube.bounding_rect,
        BoundingRect::from_min_max(Vector3::repeat(-1.0), Vector3::repeat(1.0))
    );
}

#[test]
fn attributes_are_interleaved_in_one_buffer() {
    let headless = Rc::new(HeadlessGraphics::new());
    let shader = ShaderProgram::from_sources(&*headless, "mesh", VS, FS).unwrap();
    let renderer = ForwardRenderer::new(headless.clone());

    let mut scene = Scene::new();
    let cube = scene.insert(create_cube(&*headless, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0).unwrap());
    let view = DrawView::new(Matrix4::identity(), Matrix4::identity(), Vector3::zeros());
    renderer.draw_renderable_with_shader(&scene, cube, &shader, None, &view);

    let core = scene.get(cube).unwrap().core.clone().unwrap();
    let core = core.borrow();
    assert!(core.is_vao_initialized());

    let attribs = headless.vertex_attribs(core.vao().unwrap());
    let layout: Vec<_> = attribs.iter().map(|a| (a.components, a.stride, a.offset)).collect();
    assert_eq!(layout, vec![(3, 44, 0), (3, 44, 12), (2, 44, 24), (3, 44, 32)]);
    assert!(attribs.iter().all(|a| a.data_type == DataType::Float && !a.integer));

    let vbo = core.vertices.unwrap().buffer;
    assert!(attribs.iter().all(|a| a.buffer == Some(vbo)));
    assert_eq!(headless.buffer_len(vbo), Some(24 * 44));
    assert_eq!(headless.get_attrib_location(shader.program(), "VERTEX_UV_0"), Some(2));
}

#[test]
fn wire_cube_draws_as_lines() {
    let headless = Rc::new(HeadlessGraphics::new());
    let shader = ShaderProgram::from_sources(&*headless, "mesh", VS, FS).unwrap();
    let renderer = ForwardRenderer::new(headless.clone());

    let mut scene = Scene::new();
    let wire = scene.insert(create_wire_cube(&*headless, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0).unwrap());
    let view = DrawView::new(Matrix4::identity(), Matrix4::identity(), Vector3::zeros());
    renderer.draw_lines(&scene, wire, &shader, None, &view);

    let draws = headless.draw_calls();
    assert_eq!(draws.len(), 1);
    assert!(matches!(
        draws[0],
        fizzle::graphics::Call::Draw {
            mode: DrawMode::Lines,
            count: 24,
            ..
        }
    ));
}

#[test]
fn skinned_cube_uploads_bones_and_integer_ids() {
    const SKINNED_VS: &str = "uniform mat4 MVP_MATRIX;
        uniform mat4 BONES[32];
        in vec3 VERTEX_POSITION;
        in ivec4 VERTEX_BONE_IDS;
        in vec4 VERTEX_BONE_WEIGHTS;
        void main() {}";

    let headless = Rc::new(HeadlessGraphics::new());
    let shader = ShaderProgram::from_sources(&*headless, "skinned", SKINNED_VS, FS).unwrap();
    let renderer = ForwardRenderer::new(headless.clone());

    let mut mesh = cube_mesh(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0);
    mesh.bone_ids = vec![[0, 1, 0, 0]; mesh.vertex_count()];
    mesh.bone_weights = vec![[0.5, 0.5, 0.0, 0.0]; mesh.vertex_count()];
    let cube = Renderable::from_mesh(&*headless, &mesh).unwrap();

    let arm_pose = Matrix4::new_translation(&Vector3::new(0.0, 3.0, 0.0));
    {
        let mut core = cube.core.as_ref().unwrap().borrow_mut();
        let mut skeleton = Skeleton::new(vec![
            Bone::new("root", None, Matrix4::identity()),
            Bone::new("arm", Some(0), Matrix4::identity()),
        ])
        .unwrap();
        assert!(skeleton.set_pose(1, arm_pose));
        core.skeleton = Some(skeleton);
    }

    let mut scene = Scene::new();
    let cube = scene.insert(cube);
    let view = DrawView::new(Matrix4::identity(), Matrix4::identity(), Vector3::zeros());
    renderer.draw_renderable_with_shader(&scene, cube, &shader, None, &view);
    assert_eq!(headless.draw_count(), 1);

    let core = scene.get(cube).unwrap().core.clone().unwrap();
    let core = core.borrow();
    let attribs = headless.vertex_attribs(core.vao().unwrap());
    let attrib = |name: &str| {
        let location = headless.get_attrib_location(shader.program(), name).unwrap();
        attribs.iter().find(|a| a.location == location).copied().unwrap()
    };

    let ids = attrib("VERTEX_BONE_IDS");
    let id_buffer = core.bone_ids.unwrap().buffer;
    assert!(ids.integer);
    assert_eq!((ids.components, ids.data_type), (4, DataType::UnsignedInt));
    assert_eq!(ids.buffer, Some(id_buffer));
    assert_eq!(headless.buffer_len(id_buffer), Some(24 * 16));

    let weights = attrib("VERTEX_BONE_WEIGHTS");
    assert!(!weights.integer);
    assert_eq!((weights.components, weights.data_type), (4, DataType::Float));
    assert_eq!(weights.buffer, Some(core.bone_weights.unwrap().buffer));
    assert_ne!(weights.buffer, Some(core.vertices.unwrap().buffer));

    let program = shader.program();
    assert_eq!(
        headless.uniform(program, "BONES[0]"),
        Some(UniformValue::Mat4(mat4_to_array(&Matrix4::identity())))
    );
    assert_eq!(
        headless.uniform(program, "BONES[1]"),
        Some(UniformValue::Mat4(mat4_to_array(&arm_pose)))
    );
}
