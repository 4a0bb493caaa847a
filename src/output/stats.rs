//! Console statistics
//!
//! Prints the outcome of a finished import and, for `--stats`, the totals
//! the repository has accumulated per site.

use crate::importer::ImportSummary;
use crate::output::OutputResult;
use crate::pipeline::SummaryStats;
use crate::repository::SqliteRepository;

/// Prints a short summary of a finished import
pub fn print_summary(summary: &ImportSummary) {
    println!("\n=== Import Summary: {} ===\n", summary.site_name);
    println!("Seed:     {}", summary.seed_url);
    println!("Outcome:  {}", summary.outcome);
    println!("Duration: {:.2}s", summary.duration_seconds());
    println!();

    println!("Pages cataloged:        {}", summary.stat(SummaryStats::PAGES));
    println!("Internal links:         {}", summary.stat(SummaryStats::INTERNAL_LINKS));
    println!("Files downloaded:       {}", summary.stat(SummaryStats::FILES));
    println!("Stylesheets downloaded: {}", summary.stat(SummaryStats::STYLESHEETS));
    println!("Errors:                 {}", summary.stat(SummaryStats::ERRORS));
    println!();

    if summary.pages_pending > 0 {
        println!(
            "{} page commits were still running when the import finished",
            summary.pages_pending
        );
    }
}

/// Prints stored statistics for every site in the repository
pub fn print_site_statistics(repository: &SqliteRepository) -> OutputResult<()> {
    let sites = repository.list_sites()?;
    if sites.is_empty() {
        println!("No sites have been imported yet");
        return Ok(());
    }

    println!("Sites ({}):", sites.len());
    for site in sites {
        println!("\n  {} ({})", site.name, site.root_url);
        println!("    Created:    {}", site.created_at);
        println!(
            "    Thumbnails: {}",
            repository.count_thumbnails(site.id)?
        );

        let summary = repository.load_summary(&site.name)?;
        if summary.is_empty() {
            println!("    No statistics recorded");
            continue;
        }
        for (category, count) in summary {
            println!("    {:<12} {}", format!("{}:", category), count);
        }
    }
    println!();

    Ok(())
}
