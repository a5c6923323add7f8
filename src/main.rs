use clap::Parser;
use tracing_subscriber::EnvFilter;

use ibtrack::bitmap_iter::BitmapIterator;
use ibtrack::config::Config;
use ibtrack::controller::Controller;
use ibtrack::reflog::DemoLogSource;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    let mut source = DemoLogSource::new(12, config.log_group_capacity);
    source.append_mtr(&[(1, 0), (1, 5), (1, 32448)]);
    source.append_mtr(&[(2, 10)]);

    let mut controller = Controller::init(
        config.data_home.clone(),
        &mut source,
        config.max_bitmap_file_size,
        config.max_page_size,
    )?;
    controller.follow(&mut source)?;

    println!("tracked_lsn = {}", controller.tracked_lsn());

    if let Some((min_lsn, max_lsn)) = config.parse_show_range() {
        let mut iter = BitmapIterator::init(&config.data_home, min_lsn, max_lsn)?;
        while iter.next()? {
            if iter.changed() {
                println!(
                    "space {} page {} (lsn [{}, {}))",
                    iter.space_id(),
                    iter.page_id(),
                    iter.start_lsn(),
                    iter.end_lsn()
                );
            }
        }
    }

    controller.shutdown();
    Ok(())
}
