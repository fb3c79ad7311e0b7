use crate::infra::Marketplace;
use clap::Args;
use juba::config::AppConfig;
use juba::error::AppError;
use juba::jobs::{Actor, ActorRole, JobFields, LifecycleError, UserId};
use juba::ratings::RatingSubmission;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Title of the demo job.
    #[arg(long, default_value = "Fix leaky faucet")]
    pub(crate) title: String,
    /// Location of the demo job.
    #[arg(long, default_value = "Cape Town")]
    pub(crate) location: String,
    /// Proposed rates, one freelancer per rate. The first bid is hired.
    #[arg(long = "rate", default_values_t = [150.0, 200.0])]
    pub(crate) rates: Vec<f64>,
    /// Stop after the selection instead of paying, completing, and rating.
    #[arg(long)]
    pub(crate) skip_completion: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        title,
        location,
        rates,
        skip_completion,
    } = args;

    let config = AppConfig::load()?;
    let marketplace = Marketplace::in_memory(&config.rate_limit, &config.marketplace);
    let service = &marketplace.jobs;

    let client = Actor::new(UserId::new(), ActorRole::Client);
    let freelancers: Vec<Actor> = rates
        .iter()
        .map(|_| Actor::new(UserId::new(), ActorRole::Freelancer))
        .collect();
    for freelancer in &freelancers {
        marketplace
            .notifications
            .register_for_job_alerts(freelancer.actor_id)?;
    }

    println!("Juba hiring demo");
    let job = service
        .create_job(
            &client,
            JobFields {
                title,
                description: "Demo job posted from the command line walkthrough.".to_string(),
                location,
                timeline: Some("This week".to_string()),
            },
        )
        .await?;
    println!("- Posted job {} \"{}\" -> {}", job.id, job.title, job.status);

    let mut bids = Vec::new();
    for (freelancer, rate) in freelancers.iter().zip(&rates) {
        let bid = service.submit_application(job.id, freelancer, *rate).await?;
        println!(
            "- Freelancer {} bid {} -> {}",
            freelancer.actor_id,
            bid.proposed_rate,
            bid.status.label()
        );
        bids.push(bid);
    }

    let Some(chosen) = bids.first() else {
        println!("No bids submitted; nothing to select.");
        return Ok(());
    };
    let acceptance = service
        .accept_application(job.id, chosen.id, &client)
        .await?;
    println!(
        "- Hired {} at {}; job now {}; {} competing bid(s) closed",
        acceptance.application.freelancer_id,
        acceptance.application.proposed_rate,
        acceptance.job.status,
        acceptance.auto_rejected.len()
    );
    for record in marketplace
        .store
        .transactions()
        .map_err(LifecycleError::from)?
    {
        println!(
            "  Transaction {} for {} ({:?})",
            record.id, record.amount, record.payment_status
        );
    }

    if !skip_completion {
        let payment = service
            .process_payment(job.id, &client, "card".to_string())
            .await?;
        println!(
            "- Paid {} with reference {}",
            payment.amount, payment.payment_reference
        );

        let done = service.complete_job(job.id, &client).await?;
        if let Some(archive_at) = done.archive_at {
            println!("- Job {} completed; archives at {}", done.id, archive_at);
        }

        let rating = marketplace
            .ratings
            .submit(
                &client,
                RatingSubmission {
                    job_id: job.id,
                    reviewed_id: acceptance.application.freelancer_id,
                    score: 5,
                    comment: Some("Fixed on the first visit.".to_string()),
                },
            )
            .await?;
        println!("- Client rated the freelancer {}/5", rating.score.get());
    }

    println!("\nNotifications delivered");
    for user in std::iter::once(&client).chain(&freelancers) {
        let inbox = marketplace.notifications.list(user.actor_id, 20, 0)?;
        for notification in inbox.iter().rev() {
            println!(
                "  [{}] {}: {}",
                user.actor_id, notification.title, notification.message
            );
        }
    }

    Ok(())
}
