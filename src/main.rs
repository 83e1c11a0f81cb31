use clap::Parser;
use color_eyre::Result;
use dayboard::{
    Config, Persistence, Profile, TaskBoard,
    cli::{self, Cli, Commands},
};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps a separate config and database
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config_path = match cli.config.as_deref() {
        Some(path) => dayboard::utils::expand_path(path),
        None => Config::get_config_path(profile)?,
    };
    let config = Config::load_with_profile(profile, Some(&config_path))?;
    dayboard::logging::init(&config, profile);
    tracing::info!(?profile, config = %config_path.display(), "starting dayboard");

    let command = cli.command.unwrap_or(Commands::Tui);
    // Theme changes only touch the config file
    if let Commands::Theme { name } = &command {
        cli::handle_theme(&config_path, profile, name.clone())?;
        return Ok(());
    }

    let store = Persistence::from_config(&config)?;
    let board = |store: Persistence| -> Result<TaskBoard> {
        let mut board = TaskBoard::new(store, &config.board);
        board.load()?;
        Ok(board)
    };

    match command {
        Commands::Tui => {
            let app = dayboard::tui::App::new(config.clone(), board(store)?)?;
            dayboard::tui::run_event_loop(app)?;
        }
        Commands::AddTask { text, category, day, start, due } => {
            cli::handle_add_task(&mut board(store)?, text, category, day, start, due)?;
        }
        Commands::Board { json } => {
            cli::handle_board(&board(store)?, json)?;
        }
        Commands::Done { id } => {
            cli::handle_done(&mut board(store)?, id)?;
        }
        Commands::Move { id, to_day, category, index } => {
            cli::handle_move(&mut board(store)?, id, to_day, category, index)?;
        }
        Commands::DeleteTask { id } => {
            cli::handle_delete_task(&mut board(store)?, id)?;
        }
        Commands::AddNote { title, content, color, category } => {
            cli::handle_add_note(&store, title, content, color, category)?;
        }
        Commands::Notes => cli::handle_notes(&store)?,
        Commands::AddDecision { title, urgent, important, notes } => {
            cli::handle_add_decision(&store, title, urgent, important, notes)?;
        }
        Commands::Decisions => cli::handle_decisions(&store)?,
        Commands::AddAlterEgo { name, description, traits } => {
            cli::handle_add_alter_ego(&store, name, description, traits)?;
        }
        Commands::AlterEgos => cli::handle_alter_egos(&store)?,
        Commands::Say { alter_ego_id, text, as_alter_ego } => {
            cli::handle_say(&store, alter_ego_id, text, as_alter_ego)?;
        }
        Commands::Sync => cli::handle_sync(&store)?,
        Commands::Theme { .. } => {}
    }

    Ok(())
}
