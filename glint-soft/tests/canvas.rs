use glint_soft::canvas::{Canvas2d, Color};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

fn canvas_triangle() -> Canvas2d {
  let mut canvas = Canvas2d::default();
  let (width, height) = (canvas.width() as f32, canvas.height() as f32);

  canvas.begin_path();
  canvas.set_fill_style("rgba(0, 0, 0, 1)".parse().unwrap());
  canvas.fill_rect(0., 0., width, height);

  canvas.set_fill_style("rgba(255, 0, 0, 1)".parse().unwrap());
  canvas.move_to(150., 75.);
  canvas.line_to(150., 25.);
  canvas.line_to(220., 75.);
  canvas.line_to(150., 75.);
  canvas.fill();
  canvas.close_path();

  canvas
}

#[test]
fn red_triangle_over_black_background() {
  let canvas = canvas_triangle();
  let surface = canvas.surface();

  assert_eq!(surface.size(), [300, 150]);
  assert_eq!(surface.pixel(160, 70), Some(RED));
  assert_eq!(surface.pixel(10, 10), Some(BLACK));
  assert_eq!(surface.pixel(250, 100), Some(BLACK));

  for (i, &p) in surface.pixels().iter().enumerate() {
    let (x, y) = (i as u32 % 300, i as u32 / 300);

    if p == RED {
      assert!((150..220).contains(&x) && (25..75).contains(&y), "({}, {})", x, y);
    } else {
      assert_eq!(p, BLACK, "({}, {})", x, y);
    }
  }
}

#[test]
fn translucent_fill_blends_over_the_background() {
  let mut canvas = canvas_triangle();
  canvas.set_fill_style(Color::new(0, 0, 255, 128));
  canvas.fill_rect(0., 0., 10., 10.);

  assert_eq!(canvas.surface().pixel(5, 5), Some([0, 0, 128, 255]));
}

#[test]
fn image_export_matches_the_surface() {
  let canvas = canvas_triangle();
  let image = canvas.to_image();

  assert_eq!(image.dimensions(), (300, 150));
  assert_eq!(image.get_pixel(160, 70).0, RED);
  assert_eq!(image.get_pixel(0, 0).0, BLACK);
}
