use crate::client::PromApi;
use crate::display_helpers::{kv_line_width, local_time, write_stdout};
use crate::model::RuntimeInfo;
use anyhow::{Context, Result};

const WIDTH: usize = 30;

pub async fn run(api: &impl PromApi) -> Result<()> {
    let info = api
        .runtime_info()
        .await
        .context("Error retrieving Prometheus runtime info")?;

    write_stdout(&render(&info))?;
    Ok(())
}

pub fn render(info: &RuntimeInfo) -> String {
    [
        kv_line_width("CWD:", &info.cwd, WIDTH),
        kv_line_width("Last Cfg Reload Successful?:", info.reload_config_success, WIDTH),
        kv_line_width("Last Cfg Time:", local_time(&info.last_config_time), WIDTH),
        kv_line_width("# of Chunks", info.chunk_count, WIDTH),
        kv_line_width("# of Time Series", info.time_series_count, WIDTH),
        kv_line_width("# of Corruptions", info.corruption_count, WIDTH),
        kv_line_width("# of Go Routines", info.goroutine_count, WIDTH),
        kv_line_width("GOMAXPROCS", info.gomaxprocs, WIDTH),
        kv_line_width("GOGC", &info.gogc, WIDTH),
        kv_line_width("GODEBUG", &info.godebug, WIDTH),
        kv_line_width("Data Retention", &info.storage_retention, WIDTH),
    ]
    .concat()
}
