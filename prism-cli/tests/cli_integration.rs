use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TestDir {
    path: PathBuf,
}

impl TestDir {
    fn new(tag: &str) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let path =
            std::env::temp_dir().join(format!("prism_cli_{tag}_{}_{}", std::process::id(), ts));
        fs::create_dir_all(&path).expect("create temp test dir");
        Self { path }
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_prism(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_prism"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("run prism")
}

#[test]
fn renders_a_static_expression_to_png() {
    let dir = TestDir::new("static");
    let output = run_prism(&["clamp(x + y)", "--size", "16x16"], &dir.path);

    assert!(output.status.success(), "process failed: {output:?}");
    let png = dir.path.join("out.png");
    assert!(png.is_file(), "expected {png:?}");

    let decoded = image::open(&png).expect("decode rendered png").to_rgb8();
    assert_eq!(decoded.dimensions(), (16, 16));
    // clamp(x + y) is darkest at the top-left corner and saturates to
    // white at the bottom-right, where x + y exceeds 1
    assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
    assert_eq!(decoded.get_pixel(15, 15).0, [255, 255, 255]);
}

#[test]
fn eval_flag_is_an_alternative_to_the_positional_form() {
    let dir = TestDir::new("eval_flag");
    let output = run_prism(&["-e", "sin(x)", "--size", "8x8"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");
    assert!(dir.path.join("out.png").is_file());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Expression: sin(x)"),
        "expected echo of the parsed tree, got: {stderr}"
    );
}

#[test]
fn parse_error_exits_nonzero_without_output() {
    let dir = TestDir::new("parse_error");
    let output = run_prism(&["clamp(x", "--size", "8x8"], &dir.path);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error"), "stderr: {stderr}");
    assert!(!dir.path.join("out.png").exists());
}

#[test]
fn missing_image_is_a_resource_error() {
    let dir = TestDir::new("missing_image");
    let output = run_prism(
        &["imageClip(\"nowhere.png\", x, y)", "--size", "8x8"],
        &dir.path,
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nowhere.png"), "stderr: {stderr}");
}

#[test]
fn image_expression_samples_a_real_file() {
    let dir = TestDir::new("image_sample");
    // A solid mid-green texture next to the expression's working directory
    let texture = image::RgbImage::from_pixel(4, 4, image::Rgb([0, 200, 0]));
    texture
        .save(dir.path.join("tex.png"))
        .expect("write texture");

    let output = run_prism(&["imageWrap(\"tex.png\", x, y)", "--size", "8x8"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");

    let decoded = image::open(dir.path.join("out.png"))
        .expect("decode rendered png")
        .to_rgb8();
    let px = decoded.get_pixel(3, 3).0;
    assert_eq!(px[0], 0);
    assert!(px[1].abs_diff(200) <= 1, "green channel: {}", px[1]);
    assert_eq!(px[2], 0);
}

#[test]
fn frames_flag_writes_a_numbered_sequence() {
    let dir = TestDir::new("frames");
    let output = run_prism(&["x * t", "--frames", "3", "--size", "8x8"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");

    for frame in 0..3 {
        let path = dir.path.join(format!("out.{frame:03}.png"));
        assert!(path.is_file(), "expected {path:?}");
    }
    assert!(!dir.path.join("out.003.png").exists());
    assert!(!dir.path.join("out.png").exists());
}

#[test]
fn animated_expressions_default_to_a_frame_sequence() {
    let dir = TestDir::new("animated_default");
    let output = run_prism(&["t", "--size", "4x4", "-o", "anim"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");

    let out_dir = dir.path.join("anim");
    assert!(out_dir.join("out.000.png").is_file());
    assert!(!out_dir.join("out.png").exists());
    let count = fs::read_dir(&out_dir).expect("read output dir").count();
    assert_eq!(count, 50);
}

#[test]
fn static_expressions_render_one_frame() {
    let dir = TestDir::new("static_one");
    let output = run_prism(&["sin(x)", "--size", "4x4"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");
    assert!(dir.path.join("out.png").is_file());
    assert!(!dir.path.join("out.000.png").exists());
}

#[test]
fn seeded_random_renders_are_reproducible() {
    let dir = TestDir::new("seeded");
    for out in ["a", "b"] {
        let output = run_prism(
            &["random()", "--seed", "42", "--size", "8x8", "-o", out],
            &dir.path,
        );
        assert!(output.status.success(), "process failed: {output:?}");
    }

    let a = fs::read(dir.path.join("a/out.png")).expect("read first render");
    let b = fs::read(dir.path.join("b/out.png")).expect("read second render");
    assert_eq!(a, b, "same seed must reproduce the same image");
}

#[test]
fn list_functions_prints_the_registered_set() {
    let dir = TestDir::new("list");
    let output = run_prism(&["--list-functions"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(names.len(), 14);
    for name in ["clamp", "sin", "imageWrap", "perlinColor", "random"] {
        assert!(names.contains(&name), "missing {name} in: {stdout}");
    }
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted, "names should be sorted");
}

#[test]
fn no_expression_is_an_error() {
    let dir = TestDir::new("no_expr");
    let output = run_prism(&[], &dir.path);
    assert_eq!(output.status.code(), Some(1));
}
