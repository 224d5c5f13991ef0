use glint::context::GraphicsContext;
use glint::pipeline::{draw, DrawCall, Mode, PipelineError, PipelineState, Viewport};
use glint::scene::{Scene, FRAGMENT_SHADER, VERTEX_SHADER};
use glint::shader::{Program, ProgramError, StageError, StageType};
use glint::vertex::{AttributeBinding, VertexAttribType};
use glint_soft::SoftContext;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

const MISSING_SEMICOLON: &str = "attribute vec4 a_position;
void main() {
  gl_Position = a_position
}
";

#[test]
fn valid_stage_compiles() {
  let mut ctx = SoftContext::new(4, 4);
  let stage = ctx
    .new_shader_stage(StageType::VertexShader, VERTEX_SHADER)
    .unwrap();

  assert!(stage.is_compiled());
  assert_eq!(stage.ty(), StageType::VertexShader);
  assert_eq!(ctx.state().shader_count(), 1);

  drop(stage);
  assert_eq!(ctx.state().shader_count(), 0);
}

#[test]
fn invalid_stage_reports_the_token_and_leaves_nothing_behind() {
  let mut ctx = SoftContext::new(4, 4);
  let err = ctx
    .new_shader_stage(StageType::VertexShader, MISSING_SEMICOLON)
    .unwrap_err();

  match err {
    StageError::CompilationFailed(StageType::VertexShader, ref log) => {
      assert!(log.contains("ERROR: 0:4: '}' : syntax error"), "{}", log);
    }
    _ => panic!("unexpected error: {}", err),
  }

  assert_eq!(ctx.state().shader_count(), 0);
}

#[test]
fn deeply_nested_source_fails_to_compile() {
  let mut ctx = SoftContext::new(4, 4);
  let parens = format!("{}1.0{}", "(".repeat(1000), ")".repeat(1000));
  let src = format!("void main() {{ float x = {}; gl_Position = vec4(x); }}", parens);

  match ctx.new_shader_stage(StageType::VertexShader, &src) {
    Err(StageError::CompilationFailed(StageType::VertexShader, ref log)) => {
      assert!(log.contains("expression too complex"), "{}", log);
    }
    r => panic!("unexpected result: {:?}", r.map(|_| ())),
  }

  assert_eq!(ctx.state().shader_count(), 0);

  let parens = format!("{}1.0{}", "(".repeat(20), ")".repeat(20));
  let src = format!("void main() {{ float x = {}; gl_Position = vec4(x); }}", parens);
  assert!(ctx.new_shader_stage(StageType::VertexShader, &src).is_ok());
}

#[test]
fn valid_stages_link() {
  let mut ctx = SoftContext::new(4, 4);
  let program = Program::from_strings(&mut ctx, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();

  assert!(program.is_linked());
  assert_eq!(program.attrib_location("a_position"), Some(0));
  assert_eq!(program.attrib_location("a_color"), None);

  // stages are gone once linked
  assert_eq!(ctx.state().shader_count(), 0);
  assert_eq!(ctx.state().program_count(), 1);
}

#[test]
fn mismatched_interface_fails_to_link() {
  let mut ctx = SoftContext::new(4, 4);
  let vs = ctx
    .new_shader_stage(
      StageType::VertexShader,
      "attribute vec4 a_position; void main() { vec4 p = a_position; }",
    )
    .unwrap();
  let fs = ctx
    .new_shader_stage(StageType::FragmentShader, FRAGMENT_SHADER)
    .unwrap();

  match ctx.new_program(&vs, &fs) {
    Err(ProgramError::LinkFailed(log)) => assert!(log.contains("gl_Position")),
    r => panic!("unexpected link result: {:?}", r),
  }

  assert_eq!(ctx.state().program_count(), 0);
  assert_eq!(ctx.state().shader_count(), 2);
}

#[test]
fn stage_failures_stop_program_creation() {
  let mut ctx = SoftContext::new(4, 4);
  let r = Program::from_strings(
    &mut ctx,
    VERTEX_SHADER,
    "void main() { float x = 1.0; gl_FragColor = vec4(x); }",
  );

  match r {
    Err(ProgramError::StageError(StageError::CompilationFailed(StageType::FragmentShader, log))) => {
      assert!(log.contains("No precision specified for (float)"), "{}", log);
    }
    r => panic!("unexpected result: {:?}", r),
  }

  assert_eq!(ctx.state().shader_count(), 0);
  assert_eq!(ctx.state().program_count(), 0);
}

#[test]
fn red_triangle_on_black() {
  let mut ctx = SoftContext::new(300, 150);
  let _scene = Scene::default().render(&mut ctx).unwrap();

  let surface = ctx.surface();
  assert_eq!(surface.pixel(160, 70), Some(RED));
  assert_eq!(surface.pixel(10, 10), Some(BLACK));
  assert_eq!(surface.pixel(250, 100), Some(BLACK));
  assert_eq!(surface.pixel(299, 0), Some(BLACK));

  // the triangle spans x in [150, 255) and rows 37 to 74 of the image
  for (i, p) in surface.pixels().iter().enumerate() {
    let (x, y) = (i as u32 % 300, i as u32 / 300);

    if *p == RED {
      assert!((150..255).contains(&x) && (37..75).contains(&y), "({}, {})", x, y);
    } else {
      assert_eq!(*p, BLACK);
    }
  }
}

#[test]
fn draw_leaves_its_state_in_the_context() {
  let mut ctx = SoftContext::new(300, 150);
  let scene = Scene::default().render(&mut ctx).unwrap();
  let state = ctx.state();

  assert_eq!(state.viewport(), [0, 0, 300, 150]);
  assert_eq!(state.clear_color(), [0., 0., 0., 1.]);
  assert_eq!(state.current_program(), Some(scene.program().repr().handle()));
  assert_eq!(state.bound_array_buffer(), Some(scene.buffer().repr().handle()));
  assert!(state.is_attrib_enabled(0));

  let pointer = state.attrib_pointer(0).unwrap();
  assert_eq!(pointer.components, 2);
  assert_eq!(pointer.stride, 8);
  assert_eq!(state.buffer_data(pointer.buffer).map(<[u8]>::len), Some(24));
}

#[test]
fn drawing_twice_is_bit_identical() {
  let mut ctx = SoftContext::new(300, 150);
  let scene = Scene::default().render(&mut ctx).unwrap();
  let first = ctx.surface().clone();

  scene.redraw(&mut ctx).unwrap();
  assert_eq!(*ctx.surface(), first);
}

#[test]
fn dropping_resources_clears_slots() {
  let mut ctx = SoftContext::new(300, 150);
  let scene = Scene::default().render(&mut ctx).unwrap();
  assert_eq!(ctx.state().program_count(), 1);
  assert_eq!(ctx.state().buffer_count(), 1);

  drop(scene);

  let state = ctx.state();
  assert_eq!(state.program_count(), 0);
  assert_eq!(state.buffer_count(), 0);
  assert_eq!(state.current_program(), None);
  assert_eq!(state.bound_array_buffer(), None);
  assert_eq!(state.attrib_pointer(0), None);
}

#[test]
fn inactive_attribute_is_rejected() {
  let mut ctx = SoftContext::new(8, 8);
  let program = Program::from_strings(&mut ctx, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
  let buffer = ctx
    .new_vertex_buffer(&[0f32; 6], Default::default())
    .unwrap();
  let call = DrawCall::new(AttributeBinding::new("position", 2), 3, Mode::Triangle);

  let r = draw(&mut ctx, &program, &buffer, &call, &PipelineState::default());
  assert_eq!(r, Err(PipelineError::inactive_attribute("position")));
  assert_eq!(ctx.state().current_program(), None);
}

#[test]
fn viewport_limits_the_draw() {
  let mut ctx = SoftContext::new(8, 8);
  let program = Program::from_strings(&mut ctx, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();

  // a triangle covering the whole clip space
  let buffer = ctx
    .new_vertex_buffer(&[[-1f32, -1.], [3., -1.], [-1., 3.]], Default::default())
    .unwrap();
  let call = DrawCall::new(AttributeBinding::new("a_position", 2), 3, Mode::Triangle);
  let state = PipelineState::default().set_viewport(Viewport::Specific {
    x: 0,
    y: 0,
    width: 4,
    height: 8,
  });

  draw(&mut ctx, &program, &buffer, &call, &state).unwrap();

  let surface = ctx.surface();
  assert_eq!(surface.pixel(3, 0), Some(RED));
  assert_eq!(surface.pixel(4, 0), Some(BLACK));
  assert_eq!(surface.pixel(0, 7), Some(RED));
}

#[test]
fn normalized_bytes_feed_attributes() {
  let mut ctx = SoftContext::new(2, 2);
  let program = Program::from_strings(
    &mut ctx,
    "attribute vec2 a_pos;
     void main() { gl_Position = vec4(a_pos * 2.0 - 1.0, 0.0, 1.0); gl_PointSize = 2.0; }",
    FRAGMENT_SHADER,
  )
  .unwrap();

  // (128, 128) / 255 ≈ 0.5 maps to the center of the surface
  let buffer = ctx
    .new_vertex_buffer(&[128u8, 128], Default::default())
    .unwrap();
  let binding = AttributeBinding::new("a_pos", 2)
    .set_type(VertexAttribType::UnsignedByte)
    .set_normalized(true);
  let call = DrawCall::new(binding, 1, Mode::Point);

  draw(&mut ctx, &program, &buffer, &call, &PipelineState::default()).unwrap();

  assert!(ctx.surface().pixels().iter().all(|&p| p == RED));
}

#[test]
fn runaway_shader_fails_the_draw() {
  let mut ctx = SoftContext::new(8, 8);
  let program = Program::from_strings(
    &mut ctx,
    "attribute vec4 a_position;
     void main() { vec4 p = a_position; while (true) { p.x += 1.0; } gl_Position = p; }",
    FRAGMENT_SHADER,
  )
  .unwrap();
  let buffer = ctx
    .new_vertex_buffer(&[0f32; 6], Default::default())
    .unwrap();
  let call = DrawCall::new(AttributeBinding::new("a_position", 2), 3, Mode::Triangle);

  match draw(&mut ctx, &program, &buffer, &call, &PipelineState::default()) {
    Err(PipelineError::ExecutionFailed(reason)) => assert!(reason.contains("65536")),
    r => panic!("unexpected draw result: {:?}", r),
  }
}
