// File: src/bin/main.rs
use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use lexicon_core::persistence::{load_index, save_index, save_json};
use lexicon_core::{
    LanguagePair, LexiconBuilder, LexiconConfig, MeaningResolver, NewVocabularyItem, TokenOverlapGrouper,
    VocabularyItem, VocabularyStore,
};
use std::io::{stdin, stdout, Write};
use std::path::{Path, PathBuf};

const CONFIG_PATH: &str = "lexicon.json";
const VOCABULARY_PATH: &str = "vocabulary.json";

#[derive(Parser)]
#[command(name = "lexicon_tool", about = "Build bilingual lexicon packs and review saved words")]
struct Cli {
    /// JSON config file; defaults apply when it is missing.
    #[arg(long, global = true, default_value = CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an index from a `forms<TAB>gloss` source file.
    Build {
        #[arg(long)]
        pair: String,
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Also write the build report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Meanings of a source-language word.
    Lookup {
        #[arg(long)]
        index: PathBuf,
        word: String,
        /// Cluster near-duplicate meanings.
        #[arg(long)]
        grouped: bool,
    },
    /// Ranked source words for a target-language word.
    Reverse {
        #[arg(long)]
        index: PathBuf,
        word: String,
    },
    /// Base words containing a fragment.
    Search {
        #[arg(long)]
        index: PathBuf,
        fragment: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Check an index for broken invariants.
    Verify {
        #[arg(long)]
        index: PathBuf,
    },
    /// Save a looked-up meaning to the vocabulary store.
    Save {
        #[arg(long)]
        index: PathBuf,
        #[arg(long, default_value = VOCABULARY_PATH)]
        vocab: PathBuf,
        word: String,
        /// 1-based position from `lookup`, or from `reverse` with `--reverse`.
        #[arg(long, default_value_t = 1)]
        position: usize,
        /// Treat `word` as a target-language word and save the ranked
        /// source word at `position`.
        #[arg(long)]
        reverse: bool,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        book: Option<String>,
    },
    /// List items due for review.
    Due {
        #[arg(long, default_value = VOCABULARY_PATH)]
        vocab: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Interactive review session.
    Review {
        #[arg(long, default_value = VOCABULARY_PATH)]
        vocab: PathBuf,
    },
}

fn parse_pair(pair: &str) -> anyhow::Result<LanguagePair> {
    let (source, target) = pair
        .split_once('-')
        .ok_or_else(|| anyhow!("language pair must look like `es-en`, got `{}`", pair))?;
    Ok(LanguagePair::new(source, target))
}

fn open_resolver(path: &Path) -> anyhow::Result<(MeaningResolver, LanguagePair)> {
    let index = load_index(path).with_context(|| format!("loading index {:?}", path))?;
    let pair = index.language_pair();
    Ok((MeaningResolver::from_index(index)?, pair))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lexicon_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LexiconConfig::load(&cli.config)?;

    match cli.command {
        Command::Build { pair, source, out, report } => {
            let pair = parse_pair(&pair)?;
            let (index, build_report) = LexiconBuilder::build_from_path(pair, &config, &source)
                .with_context(|| format!("reading source {:?}", source))?;
            save_index(&index, &out)?;
            println!(
                "Built {}: {} accepted, {} rejected, {} meanings, {} reverse entries",
                index.metadata().pack_id,
                build_report.accepted,
                build_report.rejected,
                build_report.meanings,
                build_report.reverse_entries
            );
            for (reason, count) in &build_report.rejected_by_reason {
                println!("  {:>8}  {}", count, reason);
            }
            if let Some(report_path) = report {
                save_json(&build_report, &report_path)?;
            }
        }
        Command::Lookup { index, word, grouped } => {
            let (resolver, pair) = open_resolver(&index)?;
            if grouped {
                let clusters =
                    resolver.lookup_grouped_meanings(&word, &pair.source, &pair.target, &TokenOverlapGrouper::new(config.grouping.min_token_overlap));
                if clusters.is_empty() {
                    println!("No meanings found for '{}'.", word);
                }
                for (i, cluster) in clusters.iter().enumerate() {
                    let texts: Vec<&str> = cluster.iter().map(|m| m.expanded_text.as_str()).collect();
                    println!("{}. {}", i + 1, texts.join("; "));
                }
            } else {
                let lookup = resolver.lookup_source_meanings(&word, &pair.source, &pair.target);
                if !lookup.has_results() {
                    println!("No meanings found for '{}'.", word);
                }
                for meaning in &lookup.meanings {
                    let marker = if meaning.is_primary { "*" } else { " " };
                    println!(
                        "{} {}/{} {} {}",
                        marker,
                        meaning.position,
                        meaning.total,
                        meaning.part_of_speech_tag.as_deref().unwrap_or(""),
                        meaning.expanded_text
                    );
                }
            }
        }
        Command::Reverse { index, word } => {
            let (resolver, pair) = open_resolver(&index)?;
            let lookup = resolver.lookup_target_translations(&word, &pair.source, &pair.target);
            if !lookup.has_results() {
                println!("No translations found for '{}'.", word);
            }
            for t in &lookup.translations {
                println!(
                    "{}. {} ({}) score {} [{}]",
                    t.position,
                    t.source_word,
                    t.meaning_text,
                    t.quality_score,
                    t.quality.label()
                );
            }
        }
        Command::Search { index, fragment, limit } => {
            let (resolver, pair) = open_resolver(&index)?;
            for word in resolver.search_words(&fragment, &pair.source, &pair.target, limit)? {
                println!("{}", word);
            }
        }
        Command::Verify { index } => {
            let index = load_index(&index)?;
            let report = index.verify();
            if report.is_valid() {
                println!("{}: OK", index.metadata().pack_id);
            } else {
                for issue in &report.issues {
                    println!("{}", issue);
                }
                bail!("{} invariant violations", report.issues.len());
            }
        }
        Command::Save { index, vocab, word, position, reverse, context, book } => {
            let (resolver, pair) = open_resolver(&index)?;
            let mut new_item = if reverse {
                let lookup = resolver.lookup_target_translations(&word, &pair.source, &pair.target);
                let translation = lookup
                    .at(position)
                    .ok_or_else(|| anyhow!("'{}' has no translation at position {}", word, position))?;
                NewVocabularyItem::from_translation(translation, &pair.source, &pair.target)
            } else {
                let lookup = resolver.lookup_source_meanings(&word, &pair.source, &pair.target);
                let meaning = lookup
                    .at(position)
                    .ok_or_else(|| anyhow!("'{}' has no meaning at position {}", word, position))?;
                NewVocabularyItem::from_meaning(meaning, &pair.source, &pair.target)
            };
            new_item.context = context;
            new_item.book_reference = book;

            let store = VocabularyStore::open(&vocab, &config.review)?;
            let item = store.add_vocabulary_item(new_item)?;
            println!("Saved '{}' = '{}', first review {}", item.source_text, item.translation, item.srs.next_review_at);
        }
        Command::Due { vocab, limit } => {
            let store = VocabularyStore::open(&vocab, &config.review)?;
            let due = store.get_items_due_for_review(limit.unwrap_or(config.review.due_batch_size))?;
            if due.is_empty() {
                println!("Nothing due.");
            }
            for item in &due {
                println!("{}  {} = {}  (due {})", item.id, item.source_text, item.translation, item.srs.next_review_at);
            }
        }
        Command::Review { vocab } => {
            let store = VocabularyStore::open(&vocab, &config.review)?;
            run_review_session(&store, config.review.due_batch_size)?;
        }
    }
    Ok(())
}

fn run_review_session(store: &VocabularyStore, batch_size: usize) -> anyhow::Result<()> {
    let due = store.get_items_due_for_review(batch_size)?;
    let total = due.len();

    for (i, item) in due.iter().enumerate() {
        print_card(item, i + 1, total, false)?;
        if read_line()? == "exit" {
            break;
        }
        print_card(item, i + 1, total, true)?;

        loop {
            print!("Rate recall 0-5 (0-2 = forgot), or 'exit': ");
            stdout().flush()?;
            let input = read_line()?;
            if input == "exit" {
                return Ok(());
            }
            match input.parse::<u8>() {
                Ok(quality) if quality <= 5 => {
                    let updated = store.record_review(item.id, quality >= 3, quality)?;
                    println!("Next review: {}", updated.srs.next_review_at.format("%Y-%m-%d"));
                    break;
                }
                _ => println!("{}", "Please enter a number from 0 to 5.".red()),
            }
        }
    }

    println!("\n{}", format!("Session complete: {} item(s) reviewed.", total).green());
    Ok(())
}

fn print_card(item: &VocabularyItem, index: usize, total: usize, reveal: bool) -> anyhow::Result<()> {
    let mut out = stdout();
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    println!("Vocabulary Review ({}/{})", index, total);
    println!("---------------------------------------------------------------");
    println!("\n  {}\n", item.source_text.as_str().bold());
    if let Some(context) = &item.context {
        println!("  \"{}\"", context.as_str().italic());
    }
    if reveal {
        println!("\n  -> {}", item.translation.as_str().green());
    } else {
        print!("\nPress [Enter] to reveal, or type 'exit': ");
        out.flush()?;
    }
    Ok(())
}

fn read_line() -> anyhow::Result<String> {
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
