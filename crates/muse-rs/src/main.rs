//! Interactive terminal loop driving the Muse agents.

use anyhow::{Context, bail};
use clap::Parser;
use log::warn;
use muse_rs_config::MuseConfig;
use muse_rs_core::{
    ContentCreator, CriteriaTable, Evaluator, FeedbackSynthesizer, HttpCompletionGateway,
    HttpRankingClient,
};
use muse_rs_memory::{
    AppendRequest, Evaluation, FeedbackSynthesis, IterationStore, StoreOptions, UserEvaluation,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the Muse loop.
#[derive(Debug, Parser)]
#[command(name = "muse", about = "Iterative content creation and evaluation loop")]
struct Cli {
    /// Path to a muse.json5 config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Objective to start the first session with.
    #[arg(long)]
    prompt: Option<String>,
}

/// User choice at the end of each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Continue,
    Disagree,
    New,
    Quit,
}

/// Everything the interaction loop needs, owned in one place.
struct MuseApp {
    store: IterationStore,
    creator: ContentCreator,
    evaluator: Evaluator,
    synthesizer: FeedbackSynthesizer,
    recall_k: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    muse_rs::init_logging();
    let cli = Cli::parse();
    let config = MuseConfig::load(cli.config.as_deref()).context("loading config")?;

    let api_key = config
        .gateway
        .api_key()
        .with_context(|| format!("{} is not set", config.gateway.api_key_env))?;
    let gateway = Arc::new(
        HttpCompletionGateway::new(&config.gateway.url, api_key)
            .with_temperature(config.gateway.temperature),
    );

    let ranking_key = config.ranking.api_key().unwrap_or_default();
    if ranking_key.is_empty() {
        warn!(
            "ranking key missing, retrieval will degrade (env={})",
            config.ranking.api_key_env
        );
    }
    let ranking = Arc::new(HttpRankingClient::new(
        &config.ranking.base_url,
        ranking_key,
        &config.ranking.embed_model,
        &config.ranking.rerank_model,
    ));

    let criteria = CriteriaTable::standard();
    let mut store = IterationStore::open(
        StoreOptions {
            root: PathBuf::from(&config.memory.dir),
            archive_path: config.memory.archive_path(),
            max_size: config.memory.max_size,
            criteria: criteria.key_set(),
        },
        ranking.clone(),
        ranking,
    )
    .context("opening iteration store")?;
    for warning in store.load(None) {
        eprintln!("warning: {warning}");
    }

    let mut app = MuseApp {
        creator: ContentCreator::new(gateway.clone(), &config.models.creator),
        evaluator: Evaluator::new(gateway.clone(), &config.models.evaluator, criteria.clone()),
        synthesizer: FeedbackSynthesizer::new(gateway, &config.models.feedback, criteria.clone()),
        store,
        recall_k: config.memory.recall_k,
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut pending = cli.prompt;

    loop {
        let objective = match pending.take() {
            Some(objective) => objective,
            None => ask(&mut input, "Enter a content prompt (or 'quit' to exit): ")?,
        };
        let objective = objective.trim().to_string();
        if objective.is_empty() {
            continue;
        }
        if objective.eq_ignore_ascii_case("quit") {
            break;
        }

        app.store.start_new_session();
        let keep_going = app.run_interaction(&objective, &criteria, &mut input).await?;
        if !keep_going {
            break;
        }
    }
    Ok(())
}

impl MuseApp {
    /// Drive one objective through repeated iterations until the user
    /// moves on. Returns false when the user quits outright.
    async fn run_interaction(
        &mut self,
        objective: &str,
        criteria: &CriteriaTable,
        input: &mut impl BufRead,
    ) -> anyhow::Result<bool> {
        loop {
            println!("Fetching relevant iterations from memory...");
            let relevant = self.store.relevant_iterations(objective, self.recall_k).await;
            println!("Found {} relevant iterations.", relevant.len());
            for ranked in &relevant {
                println!(
                    "  [{:.2}] {}",
                    ranked.relevance_score,
                    snippet(&ranked.record.content)
                );
            }

            println!("Creating content...");
            let context = self.store.content_creator_context();
            let content = match self.creator.create_content(objective, &context).await {
                Ok(content) => content,
                Err(err) => {
                    warn!("content creation failed (err={err})");
                    println!(
                        "I apologize, but I couldn't generate content at this time. \
Please try again later."
                    );
                    return Ok(true);
                }
            };
            println!("\n--- Generated Content ---\n{content}\n-------------------------");

            let evaluation = match self
                .evaluator
                .evaluate(&content, objective, &self.store.evaluator_context())
                .await
            {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    warn!("evaluation failed (err={err})");
                    Evaluation::Raw {
                        text: "I apologize, but I couldn't evaluate the content at this time."
                            .to_string(),
                    }
                }
            };
            println!("\nAI Evaluation:\n{}", evaluation.display_text());

            let user_evaluation = collect_user_evaluation(criteria, input)?;
            let user_feedback_on_evaluator =
                ask(input, "Your feedback for the AI evaluator (optional): ")?;

            let recent = self.store.recent(5);
            let mut feedback = match self
                .synthesizer
                .analyze(
                    &recent,
                    objective,
                    &content,
                    &evaluation,
                    &user_evaluation,
                    &user_feedback_on_evaluator,
                )
                .await
            {
                Ok(feedback) => feedback,
                Err(err) => {
                    warn!("feedback synthesis failed (err={err})");
                    FeedbackSynthesis::Raw {
                        text: "No feedback available for this iteration.".to_string(),
                    }
                }
            };
            display_feedback(&feedback);

            let appended = self
                .store
                .append(AppendRequest {
                    prompt: objective.to_string(),
                    content,
                    ai_evaluation: evaluation,
                    user_evaluation,
                    user_feedback_on_evaluator,
                    feedback_synthesis: feedback.clone(),
                })
                .await
                .context("storing iteration")?;
            for warning in &appended.warnings {
                eprintln!("warning: {warning}");
            }

            loop {
                let choice = ask(
                    input,
                    "What would you like to do? [continue/disagree/new/quit] (continue): ",
                )?;
                match parse_decision(&choice) {
                    Some(Decision::Continue) => {
                        if feedback.needs_improvement() {
                            if let FeedbackSynthesis::Structured { report } = &feedback {
                                self.creator.learn(report.creator_feedback.clone());
                                self.evaluator.learn(report.evaluator_feedback.clone());
                            }
                            break;
                        }
                        println!("No further improvements needed. Starting a new interaction.");
                        return Ok(true);
                    }
                    Some(Decision::Disagree) => {
                        let additional =
                            ask(input, "Please provide additional feedback for improvement: ")?;
                        match self
                            .synthesizer
                            .incorporate_user_feedback(&feedback, &additional)
                            .await
                        {
                            Ok(updated) => {
                                feedback = updated;
                                display_feedback(&feedback);
                            }
                            Err(err) => warn!("feedback update failed (err={err})"),
                        }
                    }
                    Some(Decision::New) => {
                        self.store.start_new_session();
                        return Ok(true);
                    }
                    Some(Decision::Quit) => return Ok(false),
                    None => println!("Invalid command. Please try again."),
                }
            }
        }
    }
}

/// Prompt the user for per-criterion scores and comments.
fn collect_user_evaluation(
    criteria: &CriteriaTable,
    input: &mut impl BufRead,
) -> anyhow::Result<UserEvaluation> {
    println!("\nPlease rate and provide feedback for the content:");
    let mut user_evaluation = UserEvaluation::default();
    for name in criteria.names() {
        let score = loop {
            let raw = ask(input, &format!("Rate the {name} (0-10) [5]: "))?;
            let raw = raw.trim();
            if raw.is_empty() {
                break 5.0;
            }
            match parse_score(raw) {
                Some(score) => break score,
                None => println!("Please enter a number between 0 and 10."),
            }
        };
        let comment = ask(input, &format!("Provide feedback for {name}: "))?;
        user_evaluation.scores.insert(name.to_string(), score);
        if !comment.trim().is_empty() {
            user_evaluation
                .feedback
                .insert(name.to_string(), comment.trim().to_string());
        }
    }
    Ok(user_evaluation)
}

/// Print the synthesized feedback.
fn display_feedback(feedback: &FeedbackSynthesis) {
    println!("\nFeedback Agent Analysis:");
    match feedback {
        FeedbackSynthesis::Structured { report } => {
            if !report.overall_analysis.is_empty() {
                println!("\nOverall analysis:\n{}", report.overall_analysis);
            }
            if !report.creator_feedback.is_empty() {
                println!("\nFeedback for the content creator:");
                for (criterion, suggestions) in &report.creator_feedback {
                    println!("{criterion}:");
                    for suggestion in suggestions {
                        println!("- {suggestion}");
                    }
                }
            }
            if !report.evaluator_feedback.is_empty() {
                println!("\nFeedback for the evaluator:");
                for (criterion, suggestions) in &report.evaluator_feedback {
                    println!("{criterion}:");
                    for suggestion in suggestions {
                        println!("- {suggestion}");
                    }
                }
            }
            if !report.improvements_needed.is_empty() {
                println!("\nImprovements needed: {}", report.improvements_needed);
            }
        }
        FeedbackSynthesis::Raw { text } => println!("{text}"),
    }
}

/// Read one line of input after printing a prompt.
fn ask(input: &mut impl BufRead, prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed");
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// First 80 characters of a piece of content, on one line.
fn snippet(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    let mut snippet: String = line.chars().take(80).collect();
    if snippet.len() < line.len() {
        snippet.push('…');
    }
    snippet
}

/// Map a decision string to a [`Decision`]; empty input means continue.
fn parse_decision(choice: &str) -> Option<Decision> {
    match choice.trim().to_lowercase().as_str() {
        "" | "continue" | "c" => Some(Decision::Continue),
        "disagree" | "d" => Some(Decision::Disagree),
        "new" | "n" => Some(Decision::New),
        "quit" | "q" => Some(Decision::Quit),
        _ => None,
    }
}

/// Parse a 0-10 score from user input.
fn parse_score(raw: &str) -> Option<f64> {
    let score = raw.parse::<f64>().ok()?;
    (0.0..=10.0).contains(&score).then_some(score)
}
