use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = cloud_quicklink::cli::parse();
    app::run(args)
}
