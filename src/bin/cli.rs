#![cfg(not(tarpaulin_include))]

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;
use stockgrid::columns::{normalize_ticker, ColumnAction};
use stockgrid::config::Config;
use stockgrid::saving::FileStorage;
use stockgrid::source::EndpointClient;
use stockgrid::Grid;

/// Parses a 1-based column number typed by the user.
fn column_index(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().filter(|&n| n > 0).map(|n| n - 1)
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  add <ticker>: Add a column");
    println!("  del <n>: Delete column n");
    println!("  sel <n>: Select column n");
    println!("  refresh [n]: Reload column n (or the selected one), bypassing caches");
    println!("  set <ticker> <attribute>=<value>: Override a cell");
    println!("  clear <ticker> <attribute>: Remove an override");
    println!("  save <name>: Save the columns as a group");
    println!("  group <name>: Show a saved group");
    println!("  drop <name>: Delete a saved group");
    println!("  groups: List saved groups");
    println!("  deps <metric>: Rows a metric is computed from");
    println!("  disable_output / enable_output: Toggle the grid display");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let s = Instant::now();
    let config = Config::from_env()?;
    let storage = Arc::new(FileStorage::new(&config.state_path));
    let source = Arc::new(EndpointClient::new(config.endpoint.clone())?);
    let mut grid = Grid::open(storage, source, config.formulas);

    let mut status = String::from("ok");
    let mut show = true;
    loop {
        // No-op unless the columns changed.
        grid.load_visible().await;
        if show {
            print!("{}", grid.table());
        }

        print!("({}) > ", status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();
        let (verb, rest) = command.split_once(' ').unwrap_or((command, ""));
        let rest = rest.trim();

        status = String::from("ok");
        match verb {
            "" => status = String::from("invalid command"),
            "q" => break,
            "help" => print_help(),
            "disable_output" => show = false,
            "enable_output" => show = true,
            "add" => match grid.add_ticker(rest) {
                Ok(Some(_)) => {}
                Ok(None) => status = String::from("missing ticker"),
                Err(e) => status = format!("save failed: {}", e),
            },
            "del" | "sel" => match column_index(rest) {
                Some(index) => {
                    let action = if verb == "del" {
                        ColumnAction::Delete(index)
                    } else {
                        ColumnAction::Select(index)
                    };
                    if let Err(e) = grid.dispatch(action) {
                        status = format!("save failed: {}", e);
                    }
                }
                None => status = String::from("invalid column"),
            },
            "refresh" => {
                let index = column_index(rest).or(grid.selected());
                match index {
                    Some(index) => {
                        if let Err(e) = grid.refresh(index).await {
                            status = format!("refresh failed: {}", e);
                        }
                    }
                    None => status = String::from("no column selected"),
                }
            }
            "set" => {
                let parsed = rest.split_once(' ').and_then(|(ticker, assignment)| {
                    let (attribute, value) = assignment.split_once('=')?;
                    Some((normalize_ticker(ticker)?, attribute.trim(), value.trim()))
                });
                match parsed {
                    Some((ticker, attribute, value)) => grid.edit(&ticker, attribute, value),
                    None => status = String::from("usage: set <ticker> <attribute>=<value>"),
                }
            }
            "clear" => {
                let parsed = rest
                    .split_once(' ')
                    .and_then(|(ticker, attribute)| Some((normalize_ticker(ticker)?, attribute.trim())));
                match parsed {
                    Some((ticker, attribute)) => grid.clear(&ticker, attribute),
                    None => status = String::from("usage: clear <ticker> <attribute>"),
                }
            }
            "save" => {
                if let Err(e) = grid.save_group(rest) {
                    status = format!("save failed: {}", e);
                }
            }
            "group" => match grid.apply_group(rest) {
                Ok(true) => {}
                Ok(false) => status = String::from("no such group"),
                Err(e) => status = format!("save failed: {}", e),
            },
            "drop" => match grid.delete_group(rest) {
                Ok(true) => {}
                Ok(false) => status = String::from("no such group"),
                Err(e) => status = format!("save failed: {}", e),
            },
            "groups" => {
                for name in grid.groups().names() {
                    println!("  {}", name);
                }
            }
            "deps" => {
                let rows = grid.highlights(rest);
                if rows.is_empty() {
                    status = String::from("unknown metric");
                }
                for row in rows {
                    println!("  {}", row);
                }
            }
            _ => status = String::from("invalid command"),
        }
    }

    let e = s.elapsed().as_secs_f64();
    println!("Total elapsed time: {:.1} seconds", e);

    Ok(())
}
