use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;

use cantoquiz::config::{CategoryFilter, DifficultyFilter, SettingsStore};
use cantoquiz::error::QuizError;
use cantoquiz::i18n::{Catalog, Locale, MessageKey, Translate};
use cantoquiz::logging::{init_logging, LogConfig};
use cantoquiz::quiz::{ConfigUpdate, QuizSession};
use cantoquiz::runtime::{Flow, QuizApp, StdinEventSource};
use cantoquiz::storage::{LocalStorage, MemoryStore};
use cantoquiz::ui::{render, render_listing, saved_ago};
use cantoquiz::validation::validate;
use cantoquiz::vocabulary::Vocabulary;
use chrono::Utc;
use clap::{ArgAction, Parser};
use tracing::info;

/// swedish to cantonese vocabulary quiz
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A multiple-choice vocabulary quiz from Swedish to Cantonese, with Mainland and Hong Kong forms, scoring, detailed results and sessions that resume where you left off."
)]
pub struct Cli {
    /// category to practice, `all` or a category name such as `animals`
    #[clap(short, long)]
    category: Option<String>,

    /// only ask words of this difficulty
    #[clap(short, long, value_enum)]
    difficulty: Option<DifficultyFilter>,

    /// number of questions (5, 8, 10, 12, 15 or 20 are offered in setup)
    #[clap(short = 'n', long)]
    count: Option<usize>,

    /// show Hong Kong forms where a word has one (remembered for next time)
    #[clap(long)]
    hong_kong: bool,

    /// interface language
    #[clap(short, long, value_enum, default_value_t = Locale::Sv)]
    locale: Locale,

    /// load vocabulary from a directory of category JSON files instead of the built-in set
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// path of the local storage database
    #[clap(long)]
    storage: Option<PathBuf>,

    /// keep settings and progress in memory only
    #[clap(long)]
    no_persist: bool,

    /// list vocabulary (optionally matching TERM) and exit
    #[clap(long, value_name = "TERM", num_args = 0..=1, default_missing_value = "")]
    list: Option<String>,

    /// check the vocabulary for duplicates and misplaced Hong Kong characters, then exit
    #[clap(long)]
    validate: bool,

    /// discard any saved quiz and start over
    #[clap(long = "new")]
    new_quiz: bool,

    /// more log output on stderr (-v, -vv, -vvv)
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// only log errors
    #[clap(short, long)]
    quiet: bool,
}

impl Cli {
    /// Configuration changes requested on the command line.
    fn config_updates(&self) -> Vec<ConfigUpdate> {
        let mut updates = Vec::new();
        if let Some(category) = &self.category {
            updates.push(ConfigUpdate::Category(CategoryFilter::from(category.as_str())));
        }
        if let Some(difficulty) = self.difficulty {
            updates.push(ConfigUpdate::Difficulty(difficulty));
        }
        if let Some(count) = self.count {
            updates.push(ConfigUpdate::QuestionCount(count));
        }
        updates
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose, cli.quiet))?;

    let vocabulary = match &cli.data_dir {
        Some(dir) => Vocabulary::from_dir(dir)?,
        None => Vocabulary::embedded()?,
    };

    let report = validate(&vocabulary);
    if cli.validate {
        print!("{report}");
        if !report.is_clean() {
            std::process::exit(1);
        }
        return Ok(());
    }
    report.log();

    let store = if cli.no_persist {
        LocalStorage::Memory(MemoryStore::default())
    } else {
        LocalStorage::open_or_memory(cli.storage.as_deref())
    };
    let settings = SettingsStore::new(store.clone());
    if cli.hong_kong {
        settings.save_variant(true);
    }
    let use_alternate = settings.load_variant();

    if let Some(term) = &cli.list {
        let category = cli
            .category
            .as_deref()
            .map(CategoryFilter::from)
            .unwrap_or_default();
        print!("{}", render_listing(&vocabulary.search(&category, term), use_alternate));
        return Ok(());
    }

    let catalog = Catalog::new(cli.locale);
    let mut session = QuizSession::new(vocabulary, store.clone(), use_alternate);

    if cli.new_quiz {
        session.reset();
    }
    if !cli.new_quiz && session.restore() {
        if let Some(at) = session.last_persisted_at() {
            let ago = saved_ago(at, Utc::now());
            let params: [(&str, &dyn Display); 1] = [("ago", &ago)];
            println!("{}", catalog.format(MessageKey::Resuming, &params));
        }
    } else {
        let updates = cli.config_updates();
        let start_now = !updates.is_empty();
        for update in updates {
            session.configure(update)?;
        }
        if start_now {
            info!("starting from command line configuration");
            match session.start() {
                Ok(()) | Err(QuizError::InsufficientVocabulary { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    let mut app = QuizApp::new(session, settings);
    print!("{}", render(&app.session, &catalog));

    let source = StdinEventSource::new();
    app.run(&source, |app, outcome| match outcome {
        Ok(Flow::Quit) => {}
        Ok(Flow::Continue) | Err(QuizError::InsufficientVocabulary { .. }) => {
            println!();
            print!("{}", render(&app.session, &catalog));
        }
        Err(err) => println!("{err}"),
    });

    Ok(())
}
