//! A red triangle rendered through the shader pipeline: compile, link, upload, draw.

use glint::scene::Scene;
use glint_soft::SoftContext;
use std::{error::Error, fs, path::Path};

use crate::{save_image, CLIOpts};

/// Load a scene from a JSON file.
pub fn load_scene(path: &Path) -> Result<Scene, Box<dyn Error>> {
  let json = fs::read_to_string(path)?;
  let scene = serde_json::from_str(&json)?;
  log::debug!("loaded scene from {}", path.display());

  Ok(scene)
}

pub fn run(cli_opts: &CLIOpts, name: &str) -> Result<(), Box<dyn Error>> {
  let scene = match cli_opts.scene {
    Some(ref path) => load_scene(path)?,
    None => Scene::default(),
  };

  if cli_opts.window {
    return show_in_window(&scene, cli_opts, name);
  }

  let mut ctx = SoftContext::new(cli_opts.width, cli_opts.height);
  let _rendered = scene.render(&mut ctx)?;

  save_image(&ctx.to_image(), cli_opts, name)
}

#[cfg(feature = "glfw")]
fn show_in_window(scene: &Scene, cli_opts: &CLIOpts, name: &str) -> Result<(), Box<dyn Error>> {
  use glfw::{Action, Key, WindowEvent};
  use glint_glfw::GlfwSurface;

  let surface = GlfwSurface::new_windowed(name, cli_opts.width, cli_opts.height)?;
  let mut context = surface.context;
  let events = surface.events_rx;

  let rendered = scene.render(&mut context)?;
  context.swap_buffers();

  'app: loop {
    context.window.glfw.poll_events();
    for (_, event) in glfw::flush_messages(&events) {
      match event {
        WindowEvent::Close | WindowEvent::Key(Key::Escape, _, Action::Release, _) => break 'app,

        WindowEvent::FramebufferSize(..) => context.refresh_surface_size(),

        _ => (),
      }
    }

    rendered.redraw(&mut context)?;
    context.swap_buffers();
  }

  Ok(())
}

#[cfg(not(feature = "glfw"))]
fn show_in_window(_: &Scene, _: &CLIOpts, name: &str) -> Result<(), Box<dyn Error>> {
  Err(format!("{}: --window requires the glfw feature", name).into())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scene_files_override_the_defaults() {
    let path = std::env::temp_dir().join("glint-examples-scene.json");
    fs::write(
      &path,
      r#"{ "positions": [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]], "clear_color": [0.0, 0.0, 1.0, 1.0] }"#,
    )
    .unwrap();

    let scene = load_scene(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(scene.positions.len(), 3);
    assert_eq!(scene.clear_color, [0., 0., 1., 1.]);
    assert_eq!(scene.vertex_shader, Scene::default().vertex_shader);

    // the triangle covers the whole surface
    let mut ctx = SoftContext::new(8, 8);
    let _rendered = scene.render(&mut ctx).unwrap();
    assert!(ctx.surface().pixels().iter().all(|&p| p == [255, 0, 0, 255]));
  }

  #[test]
  fn invalid_scene_files_are_rejected() {
    let path = std::env::temp_dir().join("glint-examples-invalid-scene.json");
    fs::write(&path, r#"{ "positions": 42 }"#).unwrap();

    let r = load_scene(&path);
    fs::remove_file(&path).unwrap();

    assert!(r.is_err());
  }
}
