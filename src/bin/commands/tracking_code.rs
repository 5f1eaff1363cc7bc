use clap::Args;
use sitegauge::lens::tracking::{TrackingCodeArgs, TrackingCodeLens, TrackingLanguage};
use sitegauge::lens::utils::OutputFormat;
use sitegauge::AppContext;

/// Arguments for the TrackingCode command
#[derive(Args)]
pub struct TrackingCodeCommandArgs {
    #[clap(flatten)]
    pub snippet: TrackingCodeArgs,

    /// Snippet language
    #[clap(short, long, value_enum, default_value = "html")]
    pub lang: TrackingLanguage,

    /// Print snippets for every language
    #[clap(long, conflicts_with = "lang")]
    pub all: bool,
}

pub fn run(ctx: &AppContext, args: TrackingCodeCommandArgs, output_format: OutputFormat) -> i32 {
    let TrackingCodeCommandArgs { snippet, lang, all } = args;

    let lens = TrackingCodeLens::new(&snippet.with_config_defaults(&ctx.config));
    let snippets = if all {
        lens.generate_all()
    } else {
        vec![sitegauge::TrackingSnippet {
            language: lang,
            code: lens.generate(lang),
        }]
    };

    if output_format.is_json() {
        return match output_format.to_json(&snippets) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                eprintln!("ERROR: Failed to serialize snippets: {}", e);
                1
            }
        };
    }

    for (i, s) in snippets.iter().enumerate() {
        if all {
            if i > 0 {
                println!();
            }
            println!("// ===== {} =====", s.language);
        }
        println!("{}", s.code.trim_end());
    }
    0
}
