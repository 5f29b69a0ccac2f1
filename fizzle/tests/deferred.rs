use fizzle::graphics::{
    Attachment, BlendFactor, Call, FramebufferStatus, Graphics, HeadlessGraphics, TextureFormat,
    UniformValue,
};
use fizzle::meshes::create_cube;
use fizzle::renderer::deferred::DeferredPhase;
use fizzle::shader::ShaderProgram;
use fizzle::{
    DeferredFrameHandler, DeferredRenderer, DrawView, GBuffer, Light, RenderError, RenderSurface,
    Renderer, Scene,
};
use nalgebra::{Matrix4, Vector3};
use std::cell::RefCell;
use std::rc::Rc;

const COMPOSITE_VS: &str = "uniform mat4 MVP_MATRIX; in vec3 VERTEX_POSITION; in vec2 VERTEX_UV_0;
    void main() {}";
const COMPOSITE_FS: &str = "uniform sampler2D DIFFUSE_TEX;
    uniform sampler2D POSITIONS_TEX;
    uniform sampler2D NORMALS_TEX;
    uniform vec3 LIGHT_DIRECTION;
    uniform float LIGHT_DIFFUSE_INTENSITY;
    uniform vec3 CAMERA_WORLD_POSITION;
    void main() {}";

fn init_logging() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn renderer() -> (Rc<HeadlessGraphics>, DeferredRenderer) {
    init_logging();
    let headless = Rc::new(HeadlessGraphics::new());
    let gfx: &Graphics = &*headless;
    let shader = ShaderProgram::from_sources(gfx, "composite", COMPOSITE_VS, COMPOSITE_FS).unwrap();
    let renderer = DeferredRenderer::new(headless.clone(), Rc::new(shader)).unwrap();
    (headless, renderer)
}

#[test]
fn init_allocates_a_complete_gbuffer() {
    let (headless, mut renderer) = renderer();
    renderer.init(640, 480).unwrap();

    let gbuffer = renderer.gbuffer().unwrap();
    assert_eq!(gbuffer.size(), (640, 480));
    assert_eq!(headless.texture_format(gbuffer.diffuse), Some(TextureFormat::Rgba32F));
    assert_eq!(headless.texture_format(gbuffer.positions), Some(TextureFormat::Rgba32F));
    assert_eq!(headless.texture_format(gbuffer.normals), Some(TextureFormat::Rgba16F));
    assert_eq!(
        headless.framebuffer_draw_buffers(gbuffer.framebuffer),
        vec![Attachment::Color(0), Attachment::Color(1), Attachment::Color(2)]
    );
    assert_eq!(headless.live_renderbuffers(), 1);
}

#[test]
fn resizing_does_not_leak_targets() {
    let (headless, mut renderer) = renderer();
    renderer.init(320, 240).unwrap();
    let textures = headless.live_textures();
    let framebuffers = headless.live_framebuffers();

    for (w, h) in [(800, 600), (1920, 1080), (64, 64)] {
        renderer.change_resolution(w, h).unwrap();
        assert_eq!(headless.live_textures(), textures);
        assert_eq!(headless.live_framebuffers(), framebuffers);
        assert_eq!(headless.live_renderbuffers(), 1);

        let gbuffer = renderer.gbuffer().unwrap();
        assert_eq!(headless.texture_size(gbuffer.normals), Some((w, h)));
    }
    assert_eq!(renderer.resolution(), (64, 64));
}

#[test]
fn incomplete_gbuffer_is_an_error() {
    let (headless, mut renderer) = renderer();
    headless.force_incomplete_framebuffers(true);

    let result = renderer.init(640, 480);

    assert!(matches!(
        result,
        Err(RenderError::FramebufferIncomplete {
            status: FramebufferStatus::Unsupported
        })
    ));
    assert!(renderer.gbuffer().is_none());
    assert_eq!(headless.live_textures(), 0);
    assert_eq!(headless.live_framebuffers(), 0);
    assert_eq!(headless.live_renderbuffers(), 0);
}

#[test]
fn failed_gbuffer_allocation_releases_partial_targets() {
    init_logging();
    let headless = HeadlessGraphics::new();

    // framebuffer, depth renderbuffer, then the three color targets
    for budget in 0..5 {
        headless.fail_allocations_after(Some(budget));

        let result = GBuffer::new(&headless, 128, 128);

        assert!(matches!(result, Err(RenderError::Graphics { .. })), "budget {budget}");
        assert_eq!(headless.live_framebuffers(), 0);
        assert_eq!(headless.live_renderbuffers(), 0);
        assert_eq!(headless.live_textures(), 0);
        let last_bind = headless
            .calls()
            .into_iter()
            .rev()
            .find(|call| matches!(call, Call::BindFramebuffer(_)));
        assert!(matches!(last_bind, None | Some(Call::BindFramebuffer(None))));
    }

    headless.fail_allocations_after(Some(5));
    let gbuffer = GBuffer::new(&headless, 128, 128).unwrap();
    assert_eq!(headless.live_textures(), 3);
    gbuffer.destroy(&headless);
}

#[test]
fn geometry_pass_survives_a_failed_resize() {
    let (headless, mut renderer) = renderer();
    renderer.init(640, 480).unwrap();

    headless.force_incomplete_framebuffers(true);
    assert!(renderer.change_resolution(800, 600).is_err());
    assert!(renderer.gbuffer().is_none());
    assert_eq!(renderer.resolution(), (640, 480));

    headless.clear_calls();
    renderer.start_geometry_pass();
    renderer.end_geometry_pass();
    assert_eq!(renderer.phase(), DeferredPhase::Idle);
    assert!(headless.calls().contains(&Call::BindFramebuffer(None)));

    headless.force_incomplete_framebuffers(false);
    renderer.change_resolution(800, 600).unwrap();
    assert_eq!(renderer.gbuffer().map(|gbuffer| gbuffer.size()), Some((800, 600)));
}

#[test]
fn composite_accumulates_lights_additively() {
    let (headless, mut renderer) = renderer();
    renderer.init(640, 480).unwrap();
    headless.clear_calls();

    renderer.start_composite_pass();
    let sun = Light::directional(Vector3::new(0.0, -1.0, 0.0));
    let fill = Light::directional(Vector3::new(1.0, 0.0, 0.0));
    renderer.draw_directional_light(&Vector3::new(0.0, 1.0, 2.0), &sun);
    renderer.draw_directional_light(&Vector3::new(0.0, 1.0, 2.0), &fill);
    renderer.end_composite_pass();

    let calls = headless.calls();
    assert!(calls.contains(&Call::BlendFunc(BlendFactor::One, BlendFactor::One)));
    assert_eq!(headless.draw_count(), 2);

    let draws = headless.draw_calls();
    assert!(draws.iter().all(|draw| matches!(draw, Call::Draw { count: 6, .. })));

    let Call::Draw {
        program: Some(program),
        ..
    } = draws[1]
    else {
        panic!("composite draw without a program");
    };
    assert_eq!(headless.uniform(program, "DIFFUSE_TEX"), Some(UniformValue::I32(0)));
    assert_eq!(headless.uniform(program, "POSITIONS_TEX"), Some(UniformValue::I32(1)));
    assert_eq!(headless.uniform(program, "NORMALS_TEX"), Some(UniformValue::I32(2)));
    assert_eq!(
        headless.uniform(program, "LIGHT_DIRECTION"),
        Some(UniformValue::Vec3([1.0, 0.0, 0.0]))
    );
    assert_eq!(
        headless.uniform(program, "CAMERA_WORLD_POSITION"),
        Some(UniformValue::Vec3([0.0, 1.0, 2.0]))
    );
    assert_eq!(renderer.phase(), DeferredPhase::Idle);
}

struct Window {
    sizes: Vec<(u32, u32)>,
    frame: usize,
    log: Rc<RefCell<Vec<String>>>,
}

impl RenderSurface for Window {
    fn framebuffer_size(&self) -> (u32, u32) {
        self.sizes[self.frame]
    }

    fn should_close(&self) -> bool {
        self.frame >= self.sizes.len()
    }

    fn swap_buffers(&mut self) {
        self.log.borrow_mut().push("swap".to_string());
        self.frame += 1;
    }

    fn poll_events(&mut self) {
        self.log.borrow_mut().push("poll".to_string());
    }
}

struct Frame {
    scene: Scene,
    cube: fizzle::RenderableId,
    log: Rc<RefCell<Vec<String>>>,
}

impl DeferredFrameHandler for Frame {
    fn before_draw(&mut self, renderer: &mut DeferredRenderer) {
        let (w, h) = renderer.resolution();
        self.log.borrow_mut().push(format!("before {w}x{h}"));
    }

    fn geometry_pass(&mut self, renderer: &DeferredRenderer) {
        assert_eq!(renderer.phase(), DeferredPhase::Geometry);
        let view = DrawView::new(Matrix4::identity(), Matrix4::identity(), Vector3::zeros());
        renderer.draw_renderable(&self.scene, self.cube, None, &view);
        self.log.borrow_mut().push("geometry".to_string());
    }

    fn composite_pass(&mut self, renderer: &DeferredRenderer) {
        assert_eq!(renderer.phase(), DeferredPhase::Composite);
        let light = Light::directional(Vector3::new(0.0, -1.0, 0.0));
        renderer.draw_directional_light(&Vector3::zeros(), &light);
        self.log.borrow_mut().push("composite".to_string());
    }

    fn after_draw(&mut self, _renderer: &mut DeferredRenderer) {
        self.log.borrow_mut().push("after".to_string());
    }
}

#[test]
fn render_loop_runs_frames_in_order_and_follows_resizes() {
    let (headless, mut renderer) = renderer();
    renderer.init(100, 100).unwrap();
    let textures = headless.live_textures();

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut window = Window {
        sizes: vec![(100, 100), (200, 150)],
        frame: 0,
        log: log.clone(),
    };

    let mut scene = Scene::new();
    let cube = create_cube(&*headless, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0).unwrap();
    let shader = ShaderProgram::from_sources(&*headless, "geometry", COMPOSITE_VS, "void main() {}")
        .unwrap();
    cube.core.as_ref().unwrap().borrow_mut().shader = Some(Rc::new(shader));
    let cube = scene.insert(cube);
    let mut frame = Frame {
        scene,
        cube,
        log: log.clone(),
    };

    renderer.render_loop(&mut window, &mut frame).unwrap();

    let frame_log = |size: &str| {
        vec![
            format!("before {size}"),
            "geometry".to_string(),
            "composite".to_string(),
            "after".to_string(),
            "swap".to_string(),
            "poll".to_string(),
        ]
    };
    let expected: Vec<String> = [frame_log("100x100"), frame_log("200x150")].concat();
    assert_eq!(*log.borrow(), expected);

    assert_eq!(renderer.resolution(), (200, 150));
    assert_eq!(headless.live_textures(), textures);
    assert_eq!(headless.draw_count(), 4);
}
