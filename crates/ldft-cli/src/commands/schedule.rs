use crate::cli::ScheduleArgs;
use crate::error::{CliError, Result};
use ldft::engine::checkpoint::{self, CheckpointMethod};

pub fn run(args: ScheduleArgs) -> Result<()> {
    let method: CheckpointMethod = args
        .method
        .parse()
        .map_err(|e| CliError::Argument(format!("'{}': {}", args.method, e)))?;
    println!("Checkpoints of '{}' after iteration {}:", method, args.start);
    for index in listing(method, args.start, args.count) {
        println!("{index}");
    }
    Ok(())
}

/// The next `count` checkpoint indices after `start`.
pub fn listing(method: CheckpointMethod, start: usize, count: usize) -> Vec<usize> {
    checkpoint::schedule(start, method).take(count).collect()
}
