use serde::Serialize;
use sitegauge::lens::utils::OutputFormat;
use sitegauge::{format_size, vacuum, AppContext};

#[derive(Debug, Serialize)]
struct VacuumResult {
    database: String,
    size_before: u64,
    size_after: u64,
    reclaimed: u64,
}

pub fn run(ctx: &AppContext, output_format: OutputFormat) -> i32 {
    let Some(url) = ctx.config.database_url.as_deref() else {
        eprintln!("ERROR: DATABASE_URL is not defined.");
        return 1;
    };
    let schema_dir = ctx.config.schema_dir();

    let report = match vacuum(url, schema_dir.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return 1;
        }
    };

    if output_format.is_json() {
        let result = VacuumResult {
            database: url.to_string(),
            size_before: report.size_before,
            size_after: report.size_after,
            reclaimed: report.reclaimed(),
        };
        match output_format.to_json(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("ERROR: Failed to serialize result: {}", e);
                return 1;
            }
        }
    } else {
        println!(
            "Vacuumed {}: {} -> {} ({} reclaimed)",
            url,
            format_size(report.size_before),
            format_size(report.size_after),
            format_size(report.reclaimed())
        );
    }
    0
}
