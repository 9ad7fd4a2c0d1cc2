use super::*;

fn write_png(path: &std::path::Path) {
    image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]))
        .save(path)
        .unwrap();
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let err = run(["--frobnicate"]).unwrap_err();
    assert!(matches!(err, TilestackError::Usage(ref m) if m.contains("--frobnicate")));
}

#[test]
fn popping_an_empty_stack_names_the_command() {
    let err = run(["--scale", "2"]).unwrap_err();
    assert!(matches!(err, TilestackError::Usage(ref m) if m.starts_with("--scale")));
}

#[test]
fn commands_run_in_order_on_one_stack() {
    let mut tool = Tool::new();
    tool.run(Arglist::new([
        "--blackstack", "3", "4", "2", "1", "8",
        "--blackstack", "2", "4", "2", "1", "8",
        "--cat",
    ]))
    .unwrap();
    assert_eq!(tool.stack.len(), 1);
    let info = tool.stack.top("test").unwrap().borrow().info();
    assert_eq!(info.nframes, 5);
    assert_eq!((info.tile_width, info.tile_height), (4, 2));
}

#[test]
fn version_ends_the_script() {
    let mut tool = Tool::new();
    tool.run(Arglist::new(["--version", "--not-a-command"])).unwrap();
    assert!(tool.finished);
}

#[test]
fn settings_persist_between_commands() {
    let mut tool = Tool::new();
    tool.run(Arglist::new([
        "--tilesize", "256",
        "--compression", "none",
        "--downsize",
        "--create-parent-directories",
        "--projection-window", "90", "-10", "45",
    ]))
    .unwrap();
    let s = &tool.settings;
    assert_eq!(s.tilesize, 256);
    assert_eq!(s.compression, CompressionFormat::None);
    assert!(s.downsize && s.create_parent_directories);
    assert_eq!(
        s.projection_window,
        ProjectionWindow {
            field: 90.0,
            bottom: -10.0,
            top: 45.0
        }
    );
    assert!(tool.stack.is_empty());
}

#[test]
fn source_tiles_are_kept_unless_asked() {
    let dir = tempfile::tempdir().unwrap();
    let tile = dir.path().join("a.png");
    write_png(&tile);
    let tile_arg = tile.to_string_lossy().into_owned();

    run(["--loadtiles", tile_arg.as_str()]).unwrap();
    assert!(tile.exists());

    run(["--loadtiles", tile_arg.as_str(), "--delete-source-tiles"]).unwrap();
    assert!(!tile.exists());
}

#[test]
fn failed_runs_keep_source_tiles() {
    let dir = tempfile::tempdir().unwrap();
    let tile = dir.path().join("a.png");
    write_png(&tile);
    let tile_arg = tile.to_string_lossy().into_owned();

    assert!(run(["--delete-source-tiles", "--loadtiles", tile_arg.as_str(), "--cat"]).is_err());
    assert!(tile.exists());
}

#[test]
fn every_command_is_registered() {
    let names = Tool::new().command_names();
    for flag in ["--load", "--save", "--path2stack-projected", "--writevideo", "--selftest"] {
        assert!(names.contains(&flag), "{flag} missing");
    }
}
