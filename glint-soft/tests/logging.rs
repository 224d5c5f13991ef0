use glint::context::GraphicsContext;
use glint::scene::VERTEX_SHADER;
use glint::shader::StageType;
use glint_soft::SoftContext;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::sync::Once;

// Records are kept per thread since tests run concurrently.
thread_local!(static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new()));

struct CaptureLogger;

impl Log for CaptureLogger {
  fn enabled(&self, _: &Metadata) -> bool {
    true
  }

  fn log(&self, record: &Record) {
    RECORDS.with(|records| {
      records
        .borrow_mut()
        .push((record.level(), record.args().to_string()))
    });
  }

  fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<(Level, String)>) {
  INIT.call_once(|| {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);
  });

  RECORDS.with(|records| records.borrow_mut().clear());
  let r = f();
  let records = RECORDS.with(|records| records.borrow_mut().drain(..).collect());

  (r, records)
}

fn errors(records: &[(Level, String)]) -> Vec<&str> {
  records
    .iter()
    .filter(|(level, _)| *level == Level::Error)
    .map(|(_, msg)| msg.as_str())
    .collect()
}

#[test]
fn failed_compilation_is_logged_as_an_error() {
  let mut ctx = SoftContext::new(4, 4);
  let (r, records) = capture(|| {
    ctx.new_shader_stage(
      StageType::VertexShader,
      "void main() {\n  gl_Position = vec4(0.0)\n}",
    )
  });

  assert!(r.is_err());

  let errors = errors(&records);
  assert_eq!(errors.len(), 1, "{:?}", records);
  assert!(
    errors[0].contains("ERROR: 0:3: '}' : syntax error"),
    "{}",
    errors[0]
  );
}

#[test]
fn successful_compilation_logs_no_error() {
  let mut ctx = SoftContext::new(4, 4);
  let (r, records) = capture(|| ctx.new_shader_stage(StageType::VertexShader, VERTEX_SHADER));

  assert!(r.is_ok());
  assert!(errors(&records).is_empty(), "{:?}", records);
}
