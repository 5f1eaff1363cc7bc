use sitegauge::check::{run_checks, StdoutReporter};
use sitegauge::AppContext;

pub fn run(ctx: &AppContext) -> i32 {
    run_checks(&ctx.config, &mut StdoutReporter).exit_code()
}
