use serde::Serialize;
use sitegauge::lens::utils::OutputFormat;
use sitegauge::{AppConfig, AppContext};
use tabled::settings::Style;
use tabled::Table;

#[derive(Debug, Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    settings: Vec<sitegauge::ConfigEntry>,
}

pub fn run(ctx: &AppContext, config_path: Option<String>, output_format: OutputFormat) -> i32 {
    let config_file = config_path.or_else(AppConfig::config_file_path);
    let entries = ctx.entries();

    match output_format {
        OutputFormat::Table => {
            if let Some(path) = &config_file {
                println!("Config file: {}", path);
            }
            println!("{}", Table::new(&entries).with(Style::rounded()));
        }
        OutputFormat::Markdown => {
            println!("{}", Table::new(&entries).with(Style::markdown()));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let info = ConfigInfo {
                config_file,
                settings: entries,
            };
            match output_format.to_json(&info) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("ERROR: Failed to serialize config: {}", e);
                    return 1;
                }
            }
        }
    }
    0
}
