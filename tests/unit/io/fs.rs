use super::*;

#[test]
fn temporary_path_keeps_directory_and_extension() {
    let tmp = temporary_path(Path::new("out/movie.mp4"));
    assert_eq!(tmp.parent(), Some(Path::new("out")));
    assert_eq!(tmp.extension().and_then(|e| e.to_str()), Some("mp4"));
    let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("movie_tmp"));
}

#[test]
fn temporary_paths_are_unique() {
    let dest = Path::new("a.ts2");
    assert_ne!(temporary_path(dest), temporary_path(dest));
}

#[test]
fn sans_suffix_drops_only_the_last_extension() {
    assert_eq!(filename_sans_suffix(Path::new("x/page.html")), PathBuf::from("x/page"));
    assert_eq!(filename_sans_suffix(Path::new("a.b.c")), PathBuf::from("a.b"));
}

#[test]
fn write_atomically_creates_parents_and_publishes() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested/deeper/out.txt");
    write_atomically(&dest, true, |tmp| {
        std::fs::write(tmp, b"hello")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    let leftovers = std::fs::read_dir(dest.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn failed_write_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");
    let err = write_atomically(&dest, false, |tmp| {
        std::fs::write(tmp, b"partial")?;
        Err(crate::foundation::error::TilestackError::resource("boom"))
    });
    assert!(err.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
