use std::str::FromStr;

use clap::Parser;
use eyre::Result;
use petshop::Action;
use petshop_cli::opts::ConfigArgs;
use petshop_common::PetId;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: connect, adopt <id>, dismiss, show, quit";

/// CLI arguments for `petshop app`.
#[derive(Clone, Debug, Parser)]
pub struct AppArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// A line read from stdin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Input {
    Connect,
    Adopt(PetId),
    Dismiss,
    Show,
    Quit,
}

impl FromStr for Input {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let input = match (words.next(), words.next()) {
            (Some("connect"), None) => Self::Connect,
            (Some("adopt"), Some(id)) => {
                Self::Adopt(id.parse().map_err(|_| format!("invalid pet id `{id}`"))?)
            }
            (Some("dismiss"), None) => Self::Dismiss,
            (Some("show"), None) => Self::Show,
            (Some("quit" | "exit"), None) => Self::Quit,
            _ => return Err(format!("unknown command `{}`; {HELP}", s.trim())),
        };
        if words.next().is_some() {
            return Err(format!("unexpected arguments in `{}`; {HELP}", s.trim()));
        }
        Ok(input)
    }
}

impl AppArgs {
    pub async fn run(self) -> Result<()> {
        let mut app = super::app(&self.config)?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let mut shown = app.view();
        println!("{shown}");
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Input>() {
                        Ok(Input::Quit) => break,
                        Ok(Input::Show) => println!("{shown}"),
                        Ok(Input::Connect) => app.dispatch(Action::ConnectRequested),
                        Ok(Input::Adopt(pet)) => app.dispatch(Action::AdoptRequested(pet)),
                        Ok(Input::Dismiss) => app.dispatch(Action::DismissError),
                        Err(err) => eprintln!("{err}"),
                    }
                }
                _ = app.next() => {}
            }

            let view = app.view();
            if view != shown {
                println!("{view}");
                shown = view;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_input() {
        assert_eq!("connect".parse(), Ok(Input::Connect));
        assert_eq!("  adopt 4 ".parse(), Ok(Input::Adopt(4)));
        assert_eq!("quit".parse(), Ok(Input::Quit));
        assert!("adopt".parse::<Input>().unwrap_err().starts_with("unknown command `adopt`"));
        assert!("adopt x".parse::<Input>().unwrap_err().contains("invalid pet id"));
        assert!("show all".parse::<Input>().is_err());
    }
}
