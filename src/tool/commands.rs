//! Flag handlers and the table that maps flags to them.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde_json::Value;

use crate::{
    encode::{ffmpeg::ffmpeg_selftest, write_video},
    format::pixel::{CompressionFormat, PixelFormat},
    foundation::error::{TilestackError, TilestackResult},
    io::{
        fs::write_atomically,
        image::{image2tiles, load_raw, load_tiles, write_html},
    },
    pyramid::{
        path_stack::{PathTilestack, RenderMode},
        projection::{ProjectionParams, ProjectionWindow},
        stackset::{PixelSource, SingleStackSource, Stackset},
    },
    stack::{
        ops::{
            arith::{BinaryOp, BinopTilestack, UnaryOp, UnopTilestack},
            blur::{Axis, SpatialBlurTilestack, temporal_blur},
            cast::CastTilestack,
            composite::CompositeTilestack,
            concat::ConcatTilestack,
            synthetic::{BlackTilestack, PrependLeaderTilestack},
            viz::VizTilestack,
        },
        reader::TilestackReader,
        resident::ensure_resident,
        share,
    },
    tool::{Arglist, CommandFn, Tool},
    warp::path::{WarpSettings, parse_warp},
};

/// Every flag the tool understands.
pub fn registry() -> HashMap<&'static str, CommandFn> {
    let table: &[(&'static str, CommandFn)] = &[
        ("--load", load),
        ("--save", save),
        ("--loadtiles", loadtiles),
        ("--loadtiles-from-json", loadtiles_from_json),
        ("--loadraw", loadraw),
        ("--viz", viz),
        ("--cast", cast),
        ("--cat", cat),
        ("--composite", composite),
        ("--add", add),
        ("--subtract", subtract),
        ("--scale", scale),
        ("--hblur", hblur),
        ("--vblur", vblur),
        ("--tblur", tblur),
        ("--path2stack", path2stack),
        ("--path2stack-projected", path2stack_projected),
        ("--path2stack-from-stack", path2stack_from_stack),
        ("--projection-window", projection_window),
        ("--downsize", downsize),
        ("--compression", compression),
        ("--tilestackinfo", tilestackinfo),
        ("--createfile", createfile),
        ("--writehtml", writehtml),
        ("--writevideo", writevideo),
        ("--prependleader", prependleader),
        ("--blackstack", blackstack),
        ("--image2tiles", image2tiles_cmd),
        ("--tilesize", tilesize),
        ("--create-parent-directories", create_parent_directories),
        ("--delete-source-tiles", delete_source_tiles),
        ("--version", version),
        ("--selftest", selftest),
    ];
    table.iter().copied().collect()
}

fn require_ts2(cmd: &str, path: &Path) -> TilestackResult<()> {
    if path.extension().and_then(|e| e.to_str()) == Some("ts2") {
        Ok(())
    } else {
        Err(TilestackError::usage(format!(
            "{cmd}: filename must end in .ts2, got '{}'",
            path.display()
        )))
    }
}

fn load(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let src = PathBuf::from(args.shift("--load src.ts2")?);
    require_ts2("--load", &src)?;
    tool.stack.push(share(TilestackReader::open(&src)?));
    Ok(())
}

fn save(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let dest = PathBuf::from(args.shift("--save dest.ts2")?);
    require_ts2("--save", &dest)?;
    let src = tool.stack.pop("--save")?;
    let compression = tool.settings.compression;
    let create_parents = tool.settings.create_parent_directories;
    ensure_resident(&src, |resident| {
        write_atomically(&dest, create_parents, |tmp| {
            let file = File::create(tmp).with_context(|| format!("create '{}'", tmp.display()))?;
            let mut out = BufWriter::new(file);
            resident.write(&mut out, compression)?;
            out.flush().with_context(|| format!("flush '{}'", tmp.display()))?;
            Ok(())
        })
    })?;
    tracing::info!(dest = %dest.display(), "created");
    Ok(())
}

fn push_tiles(tool: &mut Tool, srcs: Vec<String>) -> TilestackResult<()> {
    if srcs.is_empty() {
        return Err(TilestackError::usage("--loadtiles must have at least one tile"));
    }
    let ts = load_tiles(&srcs)?;
    tool.settings.source_tiles.extend(srcs.into_iter().map(PathBuf::from));
    tool.stack.push(share(ts));
    Ok(())
}

fn loadtiles(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let srcs = args.shift_until_flag();
    push_tiles(tool, srcs)
}

fn loadtiles_from_json(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let json_path = PathBuf::from(args.shift("--loadtiles-from-json path.json")?);
    let text = std::fs::read_to_string(&json_path).map_err(|e| {
        TilestackError::resource(format!("can't read {}: {e}", json_path.display()))
    })?;
    let json: Value = serde_json::from_str(&text)
        .map_err(|e| TilestackError::serde(format!("can't parse {}: {e}", json_path.display())))?;
    let tiles = json
        .get("tiles")
        .and_then(Value::as_array)
        .ok_or_else(|| TilestackError::usage(format!("{}: missing 'tiles' array", json_path.display())))?
        .iter()
        .map(|t| {
            t.as_str()
                .map(str::to_owned)
                .ok_or_else(|| TilestackError::usage("--loadtiles-from-json: tiles must be strings"))
        })
        .collect::<TilestackResult<Vec<_>>>()?;
    if tiles.is_empty() {
        return Err(TilestackError::usage(format!(
            "--loadtiles-from-json: {} lists no tiles",
            json_path.display()
        )));
    }
    std::fs::remove_file(&json_path)
        .with_context(|| format!("delete '{}'", json_path.display()))?;
    push_tiles(tool, tiles)
}

fn loadraw(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let path = PathBuf::from(args.shift("--loadraw file")?);
    let width: u32 = args.shift_parse("--loadraw width")?;
    let height: u32 = args.shift_parse("--loadraw height")?;
    let dtype = args.shift("--loadraw dtype")?;
    let channels: u32 = args.shift_parse("--loadraw channels")?;
    tool.stack.push(share(load_raw(&path, width, height, &dtype, channels)?));
    Ok(())
}

fn viz(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let params = args.shift_json("--viz params")?;
    let src = tool.stack.pop("--viz")?;
    tool.stack.push(share(VizTilestack::new(src, &params)?));
    Ok(())
}

fn cast(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let format = PixelFormat::parse(&args.shift("--cast int|float")?)?;
    let bits: u32 = args.shift_parse("--cast bits")?;
    let src = tool.stack.pop("--cast")?;
    tool.stack.push(share(CastTilestack::new(src, format, bits)?));
    Ok(())
}

fn cat(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    let second = tool.stack.pop("--cat")?;
    let first = tool.stack.pop("--cat")?;
    tool.stack.push(share(ConcatTilestack::new(vec![first, second])?));
    Ok(())
}

fn composite(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    let overlay = tool.stack.pop("--composite")?;
    let base = tool.stack.pop("--composite")?;
    tool.stack.push(share(CompositeTilestack::new(base, overlay)?));
    Ok(())
}

fn binop(tool: &mut Tool, cmd: &str, op: BinaryOp) -> TilestackResult<()> {
    let b = tool.stack.pop(cmd)?;
    let a = tool.stack.pop(cmd)?;
    tool.stack.push(share(BinopTilestack::new(a, b, op)?));
    Ok(())
}

fn add(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    binop(tool, "--add", BinaryOp::Add)
}

fn subtract(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    binop(tool, "--subtract", BinaryOp::Subtract)
}

fn scale(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let factor: f64 = args.shift_parse("--scale factor")?;
    let src = tool.stack.pop("--scale")?;
    tool.stack.push(share(UnopTilestack::new(src, UnaryOp::Scale(factor))?));
    Ok(())
}

fn spatial_blur(tool: &mut Tool, args: &mut Arglist, cmd: &str, axis: Axis) -> TilestackResult<()> {
    let sigma: f64 = args.shift_parse(cmd)?;
    let src = tool.stack.pop(cmd)?;
    tool.stack.push(share(SpatialBlurTilestack::new(src, axis, sigma)?));
    Ok(())
}

fn hblur(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    spatial_blur(tool, args, "--hblur sigma", Axis::Horizontal)
}

fn vblur(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    spatial_blur(tool, args, "--vblur sigma", Axis::Vertical)
}

fn tblur(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let sigma: f64 = args.shift_parse("--tblur sigma")?;
    let src = tool.stack.pop("--tblur")?;
    tool.stack.push(share(temporal_blur(src, sigma)?));
    Ok(())
}

fn shift_size(args: &mut Arglist, cmd: &str) -> TilestackResult<(u32, u32)> {
    let width: i64 = args.shift_parse(&format!("{cmd} width"))?;
    let height: i64 = args.shift_parse(&format!("{cmd} height"))?;
    if width <= 0 || height <= 0 || width > i64::from(u32::MAX) || height > i64::from(u32::MAX) {
        return Err(TilestackError::usage(format!(
            "{cmd}: width and height must be positive numbers"
        )));
    }
    Ok((width as u32, height as u32))
}

fn shift_warp_settings(args: &mut Arglist, cmd: &str) -> TilestackResult<WarpSettings> {
    if args.next_is_non_flag() {
        WarpSettings::from_json(&args.shift_json(&format!("{cmd} warp-settings"))?)
    } else {
        Ok(WarpSettings::default())
    }
}

fn push_path_stack(
    tool: &mut Tool,
    source: Box<dyn PixelSource>,
    (width, height): (u32, u32),
    path: &Value,
    settings: &WarpSettings,
    mode: RenderMode,
) -> TilestackResult<()> {
    let frames = parse_warp(path, settings, source.nframes())?;
    tool.stack
        .push(share(PathTilestack::new(source, width, height, frames, mode)?));
    Ok(())
}

fn path2stack(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let size = shift_size(args, "--path2stack")?;
    let path = args.shift_json("--path2stack path")?;
    let stackset = PathBuf::from(args.shift("--path2stack stackset")?);
    let settings = shift_warp_settings(args, "--path2stack")?;
    let source = Box::new(Stackset::open(&stackset)?);
    let mode = RenderMode::Planar {
        downsize: tool.settings.downsize,
    };
    push_path_stack(tool, source, size, &path, &settings, mode)
}

fn path2stack_projected(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    const CMD: &str = "--path2stack-projected";
    let size = shift_size(args, CMD)?;
    let params = ProjectionParams {
        px_per_radian: args.shift_parse(&format!("{CMD} pxPerRadian"))?,
        xr1: args.shift_parse(&format!("{CMD} XR1"))?,
        xr2: args.shift_parse(&format!("{CMD} XR2"))?,
        yr: args.shift_parse(&format!("{CMD} YR"))?,
        pitch: args.shift_parse(&format!("{CMD} pitch"))?,
        yaw: args.shift_parse(&format!("{CMD} yaw"))?,
    };
    let path = args.shift_json(&format!("{CMD} path"))?;
    let stackset = PathBuf::from(args.shift(&format!("{CMD} stackset"))?);
    let settings = shift_warp_settings(args, CMD)?;
    let source = Box::new(Stackset::open(&stackset)?);
    let mode = RenderMode::Projected {
        params,
        window: tool.settings.projection_window,
    };
    push_path_stack(tool, source, size, &path, &settings, mode)
}

fn path2stack_from_stack(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    const CMD: &str = "--path2stack-from-stack";
    let size = shift_size(args, CMD)?;
    let path = args.shift_json(&format!("{CMD} path"))?;
    let settings = shift_warp_settings(args, CMD)?;
    let src = tool.stack.pop(CMD)?;
    let mode = RenderMode::Planar {
        downsize: tool.settings.downsize,
    };
    push_path_stack(tool, Box::new(SingleStackSource::new(src)), size, &path, &settings, mode)
}

fn projection_window(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    tool.settings.projection_window = ProjectionWindow {
        field: args.shift_parse("--projection-window field")?,
        bottom: args.shift_parse("--projection-window bottom")?,
        top: args.shift_parse("--projection-window top")?,
    };
    Ok(())
}

fn downsize(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    tool.settings.downsize = true;
    Ok(())
}

fn compression(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    tool.settings.compression = CompressionFormat::parse(&args.shift("--compression none|zlib")?)?;
    Ok(())
}

fn tilestackinfo(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    let info = tool.stack.top("--tilestackinfo")?.borrow().info();
    let json = serde_json::to_string(&info)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("write to stdout")?;
    Ok(())
}

fn createfile(_tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let path = PathBuf::from(args.shift("--createfile path")?);
    File::create(&path).with_context(|| format!("create '{}'", path.display()))?;
    Ok(())
}

fn writehtml(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let dest = PathBuf::from(args.shift("--writehtml dest.html")?);
    let src = tool.stack.pop("--writehtml")?;
    write_html(&src, &dest)?;
    Ok(())
}

fn writevideo(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let dest = PathBuf::from(args.shift("--writevideo dest")?);
    let fps: f64 = args.shift_parse("--writevideo fps")?;
    let compression: f64 = args.shift_parse("--writevideo compression")?;
    let src = tool.stack.pop("--writevideo")?;
    write_video(&src, &dest, fps, compression, tool.settings.create_parent_directories)
}

fn prependleader(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let n: usize = args.shift_parse("--prependleader nframes")?;
    let src = tool.stack.pop("--prependleader")?;
    tool.stack.push(share(PrependLeaderTilestack::new(src, n)?));
    Ok(())
}

fn blackstack(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let nframes: usize = args.shift_parse("--blackstack nframes")?;
    let (width, height) = shift_size(args, "--blackstack")?;
    let bands: u32 = args.shift_parse("--blackstack bands_per_pixel")?;
    let bits: u32 = args.shift_parse("--blackstack bits_per_band")?;
    tool.stack
        .push(share(BlackTilestack::new(nframes, width, height, bands, bits)?));
    Ok(())
}

fn image2tiles_cmd(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let dest = PathBuf::from(args.shift("--image2tiles dest_dir")?);
    let format = args.shift("--image2tiles format")?;
    let src = PathBuf::from(args.shift("--image2tiles src_image")?);
    image2tiles(&dest, &format, &src, tool.settings.tilesize)
}

fn tilesize(tool: &mut Tool, args: &mut Arglist) -> TilestackResult<()> {
    let size: u32 = args.shift_parse("--tilesize N")?;
    if size == 0 {
        return Err(TilestackError::usage("--tilesize must be positive"));
    }
    tool.settings.tilesize = size;
    Ok(())
}

fn create_parent_directories(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    tool.settings.create_parent_directories = true;
    Ok(())
}

fn delete_source_tiles(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    tool.settings.delete_source_tiles = true;
    Ok(())
}

fn version(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", env!("CARGO_PKG_VERSION")).context("write to stdout")?;
    tool.finished = true;
    Ok(())
}

fn selftest(tool: &mut Tool, _args: &mut Arglist) -> TilestackResult<()> {
    tool.finished = true;
    if ffmpeg_selftest() {
        tracing::info!("self-test succeeded");
        Ok(())
    } else {
        Err(TilestackError::resource("self-test FAILED"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tool/commands.rs"]
mod tests;
