// UI layer: the interactive menu built with `dialoguer`. Every registered
// command is one entry; exit and log-out are handled here directly.

use anyhow::{Context, Result};
use dialoguer::{Password, Select};

use crate::api::ConnectClient;
use crate::auth::TokenStore;
use crate::commands;
use crate::config::Config;
use crate::console::Console;
use crate::dispatch::{DispatchError, Dispatcher, SessionState};
use crate::registry::{Registry, Selector};

enum MenuChoice<'a> {
    Command(&'a str),
    Exit,
    LogOut,
}

/// Menu labels in registry order, followed by the two exit entries.
pub fn menu_items(registry: &Registry) -> Vec<String> {
    let mut items: Vec<String> = registry
        .descriptors()
        .map(|p| format!("{:>4}  {}", p.selector(), p.label()))
        .collect();
    items.push(format!("{:>4}  {}", "q", "Exit without logging out"));
    items.push(format!("{:>4}  {}", "Q", "Log session out and exit"));
    items
}

fn choice_at(registry: &Registry, index: usize) -> MenuChoice<'_> {
    let commands = registry.len();
    match index {
        i if i < commands => registry
            .descriptors()
            .nth(i)
            .map(|p| MenuChoice::Command(p.selector().as_str()))
            .unwrap_or(MenuChoice::Exit),
        i if i == commands => MenuChoice::Exit,
        _ => MenuChoice::LogOut,
    }
}

/// Return the stored token or ask for one and remember it.
fn obtain_token(store: &TokenStore, console: &Console) -> Result<String> {
    if let Some(token) = store.load()? {
        return Ok(token);
    }
    console.info(&format!(
        "No stored access token found at {}.",
        store.path().display()
    ));
    let token: String = Password::new()
        .with_prompt("Access token")
        .interact()
        .context("Failed to read access token")?;
    store.persist(&token)?;
    console.success(&format!("Token stored in {} for future use.", store.path().display()));
    Ok(token)
}

/// Main interactive loop. Runs until the user picks one of the exit entries.
pub fn main_menu(config: Config, console: Console) -> Result<()> {
    console.title("Garmin Connect activity tools");

    let store = TokenStore::from_config(&config.connect);
    let token = obtain_token(&store, &console)?;
    let api = ConnectClient::new(&config.connect, &token)?;

    let registry = commands::builtin(&config, &console)?;
    let default_retrieval = Selector::new(&config.session.default_retrieval)?;
    let dispatcher = Dispatcher::new(&registry, &api, default_retrieval);
    let mut session = SessionState::new();
    let items = menu_items(&registry);

    loop {
        let selection = Select::new()
            .with_prompt("Make your selection")
            .items(&items)
            .default(0)
            .interact()?;
        match choice_at(&registry, selection) {
            MenuChoice::Exit => {
                console.info("Exiting the program without logging out session. Goodbye!");
                break;
            }
            MenuChoice::LogOut => {
                store.clear()?;
                console.info("Logged out successfully. Goodbye!");
                break;
            }
            MenuChoice::Command(selector) => match dispatcher.dispatch(selector, &mut session) {
                Ok(outcome) => tracing::debug!(?outcome, "command finished"),
                Err(err @ DispatchError::MissingUpstreamData { .. }) => console.warn(&err.to_string()),
                Err(err) => console.error(&err.to_string()),
            },
        }
    }
    Ok(())
}
