// Tier List History - Command line front end

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tierlist_history::comparison::candidates;
use tierlist_history::model::parse_calendar_date;
use tierlist_history::{
    collection_stats, filter_demon_levels, revision_view, unique_artists, AppConfig, ChangeKind, ComparisonSession,
    Dashboard, DemonListType, EditBuffer, PoolFilter, Snapshot, Tier,
};

#[derive(Parser)]
#[command(name = "tierlist", version, about = "Song tier list history from the community spreadsheet")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "TIERLIST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Shared secret for saving back to the sheet
    #[arg(long, env = "TIERLIST_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Local song sheet export (use with --history instead of the remote sheet)
    #[arg(long, global = true, requires = "history")]
    songs: Option<PathBuf>,

    /// Local history sheet export
    #[arg(long, global = true, requires = "songs")]
    history: Option<PathBuf>,

    /// Local demon list export
    #[arg(long, global = true)]
    demons: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Current main list with tiers and scores
    Rankings {
        /// Show a past snapshot (0 = oldest) annotated with today's ranks
        #[arg(long, conflicts_with = "at")]
        revision: Option<usize>,
        /// Show the ranking as it stood on a date
        #[arg(long)]
        at: Option<String>,
    },
    /// Songs that dropped off the list
    Legacy,
    /// Songs waiting to be ranked
    Unranked,
    /// Changes replayed from the changelog, newest first
    Changelog {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Rank history of one song
    History {
        title: String,
        /// Only show changes on or after this date
        #[arg(long)]
        since: Option<String>,
    },
    /// Totals, tier distribution and top artists of the main list
    Stats,
    /// Tier scores of the main list
    Scores,
    /// Demon list levels
    Demons {
        /// main, extended or all
        #[arg(long, default_value = "main")]
        list: String,
        /// Lowest completion category to include
        #[arg(long, default_value = "Verified")]
        filter: String,
    },
    /// Head-to-head votes on random pairs (reads 1, 2 or q from stdin)
    Compare {
        #[arg(long)]
        include_legacy: bool,
        #[arg(long)]
        include_unranked: bool,
        /// Restrict main-list songs to these tiers
        #[arg(long, value_delimiter = ',')]
        tiers: Vec<String>,
        /// Write the votes as CSV when done
        #[arg(long)]
        votes_out: Option<PathBuf>,
    },
    /// Move a song to a new rank and print the changelog block
    Move {
        title: String,
        rank: usize,
        /// Save the sheet and append the changelog through the script endpoint
        #[arg(long)]
        save: bool,
    },
    /// Write the whole model as JSON
    Export { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?.with_token(cli.token.clone());
    init_tracing(&config.logging.level);

    let dashboard = load(&cli, &config)?;

    match &cli.command {
        Command::Rankings { revision: Some(index), .. } => print_revision(&dashboard, *index)?,
        Command::Rankings { at: Some(date), .. } => print_ranking_at(&dashboard, date)?,
        Command::Rankings { .. } => print_rankings(&dashboard),
        Command::Legacy => print_legacy(&dashboard),
        Command::Unranked => print_unranked(&dashboard),
        Command::Changelog { limit } => print_changelog(&dashboard, *limit),
        Command::History { title, since } => print_history(&dashboard, title, since.as_deref())?,
        Command::Stats => print_stats(&dashboard),
        Command::Scores => print_scores(&dashboard),
        Command::Demons { list, filter } => print_demons(&dashboard, list, filter)?,
        Command::Compare { include_legacy, include_unranked, tiers, votes_out } => {
            let filter = pool_filter(*include_legacy, *include_unranked, tiers)?;
            run_compare(&dashboard, &filter, votes_out.as_deref())?
        }
        Command::Move { title, rank, save } => run_move(&dashboard, &config, title, *rank, *save)?,
        Command::Export { path } => {
            dashboard.export(path)?;
            println!("✓ Exported dashboard to {}", path.display());
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

// ============================================================================
// Loading
// ============================================================================

fn load(cli: &Cli, config: &AppConfig) -> Result<Dashboard> {
    match (&cli.songs, &cli.history) {
        (Some(songs), Some(history)) => Dashboard::from_files(songs, history, cli.demons.as_deref()),
        _ => load_remote(config),
    }
}

#[cfg(feature = "remote")]
fn load_remote(config: &AppConfig) -> Result<Dashboard> {
    let client = tierlist_history::SheetClient::new(config.sheets.clone());
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(client.load_dashboard())
}

#[cfg(not(feature = "remote"))]
fn load_remote(_config: &AppConfig) -> Result<Dashboard> {
    bail!("Remote sheet access not available; pass --songs and --history, or rebuild with --features remote")
}

// ============================================================================
// Views
// ============================================================================

fn tier_label(tier: Option<Tier>) -> &'static str {
    tier.map(|t| t.label()).unwrap_or("-")
}

fn print_rankings(dashboard: &Dashboard) {
    println!("🏆 Main list");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for song in dashboard.main_songs() {
        let score = dashboard
            .scores
            .get(&song.key())
            .map(|s| format!("{:6.2}", s))
            .unwrap_or_else(|| "     -".to_string());
        println!("#{:<4} {:<4} {}  {} - {}", song.rank, tier_label(song.tier), score, song.title, song.artist);
    }
}

fn parse_date_arg(raw: &str) -> Result<chrono::NaiveDateTime> {
    parse_calendar_date(raw)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .with_context(|| format!("Unreadable date \"{}\"", raw))
}

fn print_revision(dashboard: &Dashboard, index: usize) -> Result<()> {
    let Some(snapshot) = dashboard.snapshots.get(index) else {
        bail!("No snapshot #{} ({} available)", index, dashboard.snapshots.len());
    };
    print_snapshot(dashboard, snapshot);
    Ok(())
}

fn print_ranking_at(dashboard: &Dashboard, raw: &str) -> Result<()> {
    // End of the given day
    let at = parse_date_arg(raw)? + chrono::Duration::days(1) - chrono::Duration::milliseconds(1);
    let Some(snapshot) = dashboard.snapshot_at(at) else {
        bail!("No ranking recorded on or before {}", raw);
    };
    print_snapshot(dashboard, snapshot);
    Ok(())
}

fn print_snapshot(dashboard: &Dashboard, snapshot: &Snapshot) {
    let label = snapshot.revision_label.as_deref().unwrap_or("");
    println!("🕰️  Rankings as of {} {}", snapshot.date.format("%Y-%m-%d %H:%M"), label);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for entry in revision_view(snapshot, &dashboard.catalog) {
        let now = entry.current_rank.map(|r| format!("now #{}", r)).unwrap_or_else(|| "gone".to_string());
        println!("#{:<4} {:<40} {}", entry.rank, entry.title, now);
    }
}

fn print_legacy(dashboard: &Dashboard) {
    println!("🪦 Legacy list");
    for legacy in dashboard.legacy_songs() {
        let seen = legacy
            .removed_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "?".to_string());
        println!("{}  last #{:<5} {} - {}", seen, legacy.last_rank, legacy.song.title, legacy.song.artist);
    }
}

fn print_unranked(dashboard: &Dashboard) {
    println!("📥 Unranked");
    for song in dashboard.unranked_songs() {
        println!("{:<10} {} - {}", song.date_added.as_deref().unwrap_or(""), song.title, song.artist);
    }
}

fn print_changelog(dashboard: &Dashboard, limit: usize) {
    println!("📜 Changelog");
    for snapshot in dashboard.changelog_feed().into_iter().take(limit) {
        let when = snapshot.date.format("%Y-%m-%d %H:%M");
        for entry in &snapshot.changelog_entries {
            println!("{}  [{:<6}] {:<10} {}", when, entry.kind.name(), rank_change(&entry.kind), entry.description);
        }
    }
}

fn rank_change(kind: &ChangeKind) -> String {
    match (kind.old_rank(), kind.new_rank()) {
        (Some(old), Some(new)) => format!("#{} → #{}", old, new),
        (None, Some(new)) => format!("→ #{}", new),
        (Some(old), None) => format!("#{} →", old),
        (None, None) => String::new(),
    }
}

fn print_history(dashboard: &Dashboard, title: &str, since: Option<&str>) -> Result<()> {
    let since = since.map(parse_date_arg).transpose()?;
    let view = dashboard
        .history_view(title, since)
        .with_context(|| format!("No history for \"{}\"", title))?;

    println!("📈 {} - {}", view.title, view.artist);
    println!("   first seen {}", view.first_seen.format("%Y-%m-%d"));
    if let Some(peak) = view.peak_rank {
        println!("   peak #{}", peak);
    }
    match view.latest_position {
        Some(position) => println!("   now #{}", position),
        None => println!("   no longer ranked"),
    }
    for point in &view.points {
        let movement = match point.movement {
            Some(m) if m > 0 => format!("▲{}", m),
            Some(m) if m < 0 => format!("▼{}", -m),
            _ => "-".to_string(),
        };
        println!("{}  #{:<4} {:<5} {}", point.date.format("%Y-%m-%d %H:%M"), point.rank, movement, point.reason);
    }
    Ok(())
}

fn print_stats(dashboard: &Dashboard) {
    let stats = collection_stats(&dashboard.main_songs());
    println!("📊 Stats");
    println!("   Total songs:    {}", stats.total);
    println!("   Unique artists: {}", stats.unique_artists);
    println!(
        "   All-time artists: {}",
        unique_artists(&dashboard.catalog.songs, &dashboard.histories).len()
    );
    println!("   Vocal:          {} ({:.1}%)", stats.vocal, stats.percent(stats.vocal));
    println!("   Instrumental:   {} ({:.1}%)", stats.instrumental, stats.percent(stats.instrumental));
    println!("\n   Tier distribution");
    for count in stats.by_tier.iter().filter(|c| c.count > 0) {
        println!("   {:<4} {}", count.tier.label(), count.count);
    }
    println!("\n   Top artists");
    for (i, artist) in stats.top_artists.iter().enumerate() {
        println!("   {:>2}. {} ({})", i + 1, artist.artist, artist.count);
    }
}

fn print_scores(dashboard: &Dashboard) {
    for song in dashboard.main_songs() {
        if let Some(score) = dashboard.scores.get(&song.key()) {
            println!("{:6.2}  {:<4} {}", score, tier_label(song.tier), song.title);
        }
    }
}

fn print_demons(dashboard: &Dashboard, list: &str, filter: &str) -> Result<()> {
    let list_type = DemonListType::parse(list).with_context(|| format!("Unknown demon list \"{}\"", list))?;
    for level in filter_demon_levels(&dashboard.demons, filter, list_type) {
        println!("#{:<4} {} by {} [{}]", level.rank, level.name, level.creator, level.list);
    }
    Ok(())
}

// ============================================================================
// Interactive
// ============================================================================

fn pool_filter(include_legacy: bool, include_unranked: bool, tiers: &[String]) -> Result<PoolFilter> {
    let mut filter = PoolFilter { include_legacy, include_unranked, ..Default::default() };
    if !tiers.is_empty() {
        filter.tiers = tiers
            .iter()
            .map(|t| Tier::parse(t).with_context(|| format!("Unknown tier \"{}\"", t)))
            .collect::<Result<_>>()?;
    }
    Ok(filter)
}

fn run_compare(dashboard: &Dashboard, filter: &PoolFilter, votes_out: Option<&std::path::Path>) -> Result<()> {
    let legacy = dashboard.legacy_songs();
    let pool = candidates(&dashboard.main_songs(), &legacy, &dashboard.unranked_songs());
    let mut session = ComparisonSession::new(pool, filter);
    let mut rng = rand::thread_rng();

    if session.next_pair(&mut rng).is_none() {
        bail!("Need at least two songs in the pool (found {})", session.pool().len());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while let Some((a, b)) = session.current_pair() {
        println!("\n1) {} - {}\n2) {} - {}", a.song.title, a.song.artist, b.song.title, b.song.artist);
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        match line.trim() {
            "1" => {
                session.record_vote(0, &mut rng);
            }
            "2" => {
                session.record_vote(1, &mut rng);
            }
            "q" | "Q" => break,
            _ => println!("Pick 1, 2 or q"),
        }
    }

    println!("\n✓ {} votes", session.votes().len());
    if let Some(path) = votes_out {
        std::fs::write(path, session.export_votes_csv())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✓ Votes written to {}", path.display());
    }
    Ok(())
}

fn run_move(dashboard: &Dashboard, config: &AppConfig, title: &str, rank: usize, save: bool) -> Result<()> {
    let now = Local::now().naive_local();
    let mut buffer = EditBuffer::new(&dashboard.catalog.songs);
    buffer.auto_log = true;

    let Some(change) = buffer.move_rank(title, rank, now.time()) else {
        bail!("Cannot move \"{}\" to #{}", title, rank);
    };
    println!("✓ {}", change);

    let content = buffer.changelog_content(now.date());
    if let Some(content) = &content {
        println!("\n{}", content);
    }

    if save {
        save_edits(config, &buffer, content.as_deref())?;
    }
    Ok(())
}

#[cfg(feature = "remote")]
fn save_edits(config: &AppConfig, buffer: &EditBuffer, changelog: Option<&str>) -> Result<()> {
    let client = tierlist_history::SheetClient::new(config.sheets.clone());
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        client.save_songs(&buffer.save_rows()).await?;
        if let Some(content) = changelog {
            client.append_changelog(content).await?;
        }
        anyhow::Ok(())
    })?;
    println!("✓ Data successfully saved!");
    Ok(())
}

#[cfg(not(feature = "remote"))]
fn save_edits(_config: &AppConfig, _buffer: &EditBuffer, _changelog: Option<&str>) -> Result<()> {
    bail!("Saving not available; rebuild with --features remote")
}
