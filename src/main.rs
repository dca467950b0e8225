use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use issuescout::discovery::topics;
use issuescout::models::{Assessment, Issue, Repository};
use issuescout::{
    ClaudeProvider, Config, DiscoveryConfig, Error, GitHubClient, IssueAssessor, IssueDiscoverer,
    RepositoryDiscoverer, Storage,
};

#[derive(Parser, Debug)]
#[command(name = "issuescout")]
#[command(version = "0.1.0")]
#[command(about = "Discover and rank open-source issues suitable for automated contribution")]
struct Args {
    /// Topic categories to search (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "llm,genai")]
    categories: Vec<String>,

    /// Fetch these repositories directly instead of searching (comma-separated owner/name)
    #[arg(long, value_delimiter = ',')]
    repos: Option<Vec<String>>,

    /// Use the curated repository list for a category instead of searching
    #[arg(long)]
    curated: Option<String>,

    /// Minimum star count for searched repositories (default from MIN_STARS)
    #[arg(long)]
    min_stars: Option<u32>,

    /// Maximum star count for searched repositories (default from MAX_STARS)
    #[arg(long)]
    max_stars: Option<u32>,

    /// Maximum repositories fetched per topic query (default from MAX_REPOS_PER_QUERY)
    #[arg(long)]
    max_repos_per_query: Option<usize>,

    /// Number of top-ranked repositories to scan for issues
    #[arg(long, default_value = "5")]
    top_repos: usize,

    /// Maximum issues collected per repository (default from MAX_ISSUES_PER_REPO)
    #[arg(long)]
    max_issues_per_repo: Option<usize>,

    /// Also query unlabeled issues to fill the per-repository cap
    #[arg(long)]
    include_unlabeled: bool,

    /// Number of top-ranked issues to assess
    #[arg(long, default_value = "10")]
    top_issues: usize,

    /// Skip the LLM assessment stage
    #[arg(long)]
    skip_assessment: bool,

    /// Output format (text, json, markdown)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Persist this run's results to the database
    #[arg(long)]
    save: bool,

    /// Database path for snapshots (default from DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,
}

#[derive(Serialize)]
struct DiscoveryReport {
    repositories: Vec<Repository>,
    issues: Vec<Issue>,
    assessments: Vec<Assessment>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("issuescout=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    // Fail before any discovery work if assessment is requested but no LLM
    // credentials are available.
    let anthropic_key = if args.skip_assessment {
        None
    } else {
        Some(config.anthropic_api_key.clone().ok_or_else(|| {
            Error::Config(
                "ANTHROPIC_API_KEY not set; pass --skip-assessment to run discovery only"
                    .to_string(),
            )
        })?)
    };

    let github = Arc::new(GitHubClient::new(&config.github_token)?);

    // Credential liveness check; a bad token aborts the run here.
    github.get_authenticated_user().await?;

    let discovery_config = DiscoveryConfig::from(&config).with_overrides(
        args.min_stars,
        args.max_stars,
        args.max_repos_per_query,
    );

    let mut repo_discoverer = RepositoryDiscoverer::new(github.clone(), discovery_config);

    let repositories = if let Some(names) = &args.repos {
        repo_discoverer.discover_by_names(names).await?
    } else if let Some(category) = &args.curated {
        let names: Vec<String> = topics::curated_repos(category)
            .into_iter()
            .map(String::from)
            .collect();
        if names.is_empty() {
            anyhow::bail!("No curated repository list for category '{}'", category);
        }
        repo_discoverer.discover_by_names(&names).await?
    } else {
        repo_discoverer.discover(&args.categories).await?
    };

    if repositories.is_empty() {
        println!("No repositories found. Try adjusting search criteria.");
        return Ok(());
    }

    let top_repos = repo_discoverer.top_repositories(args.top_repos);
    tracing::info!("Selected top {} repositories for issue discovery", top_repos.len());

    let mut issue_discoverer = IssueDiscoverer::new(github.clone());
    let max_issues_per_repo = args.max_issues_per_repo.unwrap_or(config.max_issues_per_repo);
    let issues = issue_discoverer
        .discover(&top_repos, max_issues_per_repo, args.include_unlabeled)
        .await?;

    if issues.is_empty() {
        println!("No suitable issues found.");
        return Ok(());
    }

    let top_issues = issue_discoverer.top_issues(args.top_issues);

    let assessments = match anthropic_key {
        Some(key) => {
            let provider = Arc::new(ClaudeProvider::new(key, None)?);
            let assessor = IssueAssessor::new(provider, config.concurrency_limit);
            assessor.assess(&top_issues).await
        }
        None => Vec::new(),
    };

    let report = DiscoveryReport {
        repositories: top_repos,
        issues: top_issues,
        assessments,
    };

    if args.save {
        let database = args.database.as_deref().unwrap_or(&config.database_path);
        let storage = Storage::new(database)?;
        storage.save_snapshot(&report.repositories, &report.issues, &report.assessments)?;
    }

    output_report(&report, &args)?;

    Ok(())
}

fn output_report(report: &DiscoveryReport, args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(report)?,
        "markdown" => format_markdown(report),
        _ => format_text(report),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn assessment_index(report: &DiscoveryReport) -> HashMap<u64, &Assessment> {
    report.assessments.iter().map(|a| (a.issue_id, a)).collect()
}

fn format_text(report: &DiscoveryReport) -> String {
    let now = chrono::Utc::now();
    let mut output = String::new();

    output.push_str("\n=== Repository Discovery ===\n\n");
    for repo in &report.repositories {
        output.push_str(&format!(
            "  {} [{}] {} stars, {} open issues, activity {:.1}\n",
            repo.full_name,
            repo.language.as_deref().unwrap_or("Unknown"),
            repo.stars,
            repo.open_issues_count,
            repo.activity_score(now),
        ));
    }

    output.push_str("\n=== Top Issues ===\n\n");
    let assessments = assessment_index(report);
    for (i, issue) in report.issues.iter().enumerate() {
        output.push_str(&format!(
            "  {}. [{}] #{}: {}\n",
            i + 1,
            issue.repo_full_name,
            issue.number,
            issue.title,
        ));
        output.push_str(&format!(
            "     Priority: {:.2}, Labels: {}\n",
            issue.priority_score(now),
            issue.labels.join(", "),
        ));
        if let Some(assessment) = assessments.get(&issue.id) {
            output.push_str(&format!(
                "     Composite: {:.1}/10 (feasibility {:.0}, clarity {:.0}, complexity {:.0}, scope {:.0})\n",
                assessment.composite_score(),
                assessment.feasibility_score,
                assessment.clarity_score,
                assessment.complexity_score,
                assessment.scope_score,
            ));
            output.push_str(&format!("     {}\n", assessment.reasoning));
        }
        output.push_str(&format!("     {}\n\n", issue.html_url));
    }

    output
}

fn format_markdown(report: &DiscoveryReport) -> String {
    let now = chrono::Utc::now();
    let mut output = String::new();

    output.push_str("# Issue Discovery Report\n\n");

    output.push_str("## Repositories\n\n");
    output.push_str("| Repository | Language | Stars | Open Issues | Activity |\n");
    output.push_str("|------------|----------|-------|-------------|----------|\n");
    for repo in &report.repositories {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {:.1} |\n",
            repo.full_name,
            repo.language.as_deref().unwrap_or("Unknown"),
            repo.stars,
            repo.open_issues_count,
            repo.activity_score(now),
        ));
    }

    output.push_str("\n## Issues\n\n");
    output.push_str("| # | Repository | Issue | Priority | Composite |\n");
    output.push_str("|---|------------|-------|----------|-----------|\n");
    let assessments = assessment_index(report);
    for (i, issue) in report.issues.iter().enumerate() {
        let composite = assessments
            .get(&issue.id)
            .map(|a| format!("{:.1}", a.composite_score()))
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "| {} | {} | [#{}]({}) {} | {:.2} | {} |\n",
            i + 1,
            issue.repo_full_name,
            issue.number,
            issue.html_url,
            issue.title,
            issue.priority_score(now),
            composite,
        ));
    }

    output.push_str(&format!(
        "\n---\n*Generated {}*\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
