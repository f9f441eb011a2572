//! Interactive terminal front-end.
//!
//! Prompts `>> `, recognizes `!reset`/`/reset` and `!review`/`/review`,
//! otherwise runs the pipeline with the `stream` delegate piped through the
//! citation rewriter (C8) straight to stdout.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::citations::CitationRewriter;
use crate::context::Delegates;
use crate::error::Result;
use crate::history::History;
use crate::logger;
use crate::pipeline::Pipeline;

const PROMPT: &str = ">> ";

pub async fn run(pipeline: Pipeline) -> Result<()> {
    let mut history = History::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{PROMPT}");
        io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.unwrap_or(None) else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "!reset" | "/reset" => {
                history.reset();
                println!("History cleared.");
                continue;
            }
            "!review" | "/review" => {
                println!("{}", history.review());
                continue;
            }
            _ => {}
        }

        let rewriter = Arc::new(Mutex::new(CitationRewriter::new()));
        let sink_rewriter = rewriter.clone();
        let delegates = Arc::new(Delegates::new().with_stream(move |delta: &str| {
            let ready = sink_rewriter.lock().unwrap().push(delta);
            if !ready.is_empty() {
                print!("{ready}");
                io::stdout().flush().ok();
            }
        }));

        match pipeline.run(input, history.entries().to_vec(), delegates).await {
            Ok(entry) => {
                let tail = rewriter.lock().unwrap().flush();
                println!("{tail}");
                history.push(entry);
            }
            Err(err) => {
                logger::log(format!("terminal: pipeline failed: {err}"));
                println!("Sorry, something went wrong: {err}");
            }
        }
    }

    Ok(())
}
