use crate::cli::{Command, Style};
use crate::output;
use shears_codec::{ImageCodec, Rect};
use shears_engine::{Anchor, Engine, ItemResult, Position, WatermarkOptions};
use std::process::ExitCode;
use std::sync::Arc;

pub async fn run(command: Command, engine: Engine) -> miette::Result<ExitCode> {
    match command {
        Command::Compress { paths, output, quality } => {
            output::batch(&engine.compress(&paths, &output.dir, quality).await)
        },
        Command::Convert { paths, output, to } => {
            let requests: Vec<_> = paths.iter().map(|path| (path, to.as_str())).collect();
            output::batch(&engine.convert(&requests, &output.dir).await)
        },
        Command::Crop { file, output, left, top, width, height } => {
            output::item(&engine.crop(&[file], &output.dir, Rect::new(left, top, width, height)).await)
        },
        Command::Watermark { file, text, output, style } => {
            let options = watermark_options(style)?;
            output::batch(&engine.add_watermark(&[file], &text, &output.dir, options).await)
        },
        Command::Rename { path, new_name } => {
            let item = match engine.rename_checked(&path, &new_name).await {
                Ok(target) => ItemResult::succeeded(path, target),
                Err(err) => ItemResult::failed(path, (*err).to_string()),
            };
            output::item(&item)
        },
        Command::Delete { paths } => output::batch(&engine.delete_report(&paths).await),
        Command::Resolve { dir } => match engine.resolve_output_dir(&dir).await {
            Ok(resolved) => output::path(&resolved),
            Err(err) => Err(crate::fatal(err)),
        },
    }
}

pub fn engine(options: shears_engine::Options) -> Engine {
    Engine::new(Arc::new(ImageCodec), options)
}

fn watermark_options(style: Style) -> miette::Result<WatermarkOptions> {
    let position = match (style.position, style.x_ratio, style.y_ratio) {
        (Some(anchor), _, _) => Some(Position::Anchor(anchor.parse::<Anchor>().map_err(crate::fatal)?)),
        (None, Some(x_ratio), Some(y_ratio)) => Some(Position::Ratio { x_ratio, y_ratio }),
        _ => None,
    };
    let options = WatermarkOptions {
        font_size: style.font_size,
        color: style.color,
        angle: style.angle,
        position,
    };
    tracing::debug!(?options, "Watermark options");
    Ok(options)
}
