//! Pluto - NBA 预测智能体系统
//!
//! 入口：初始化日志与配置，装配 Agent 编排器与调度器，
//! 执行一次编排运行（起始提示词来自命令行参数）。

use std::sync::Arc;

use anyhow::Context;

use pluto::agency::{Agency, Agent, AgentRole};
use pluto::agents::{GamePredictionAgent, PlayerPredictionAgent, TwitterAgent};
use pluto::config::load_config;
use pluto::db::SqliteUowFactory;
use pluto::llm::create_client_from_config;
use pluto::observability;
use pluto::predictions::FixtureContextProvider;
use pluto::scheduler::{Scheduler, TokioScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load configuration")?;
    let client = create_client_from_config(&cfg);

    let provider = Arc::new(FixtureContextProvider::demo());
    let uow_factory = Arc::new(SqliteUowFactory::new(cfg.db.path_or_default()));

    let player_agent = Arc::new(
        PlayerPredictionAgent::new(
            Arc::clone(&client),
            Arc::clone(&provider) as _,
            Arc::clone(&uow_factory) as _,
            AgentRole::Pilot,
            &cfg,
        )
        .context("Failed to build player prediction agent")?,
    );
    let game_agent = Arc::new(
        GamePredictionAgent::new(
            Arc::clone(&client),
            Arc::clone(&provider) as _,
            Arc::clone(&uow_factory) as _,
            AgentRole::Crew,
            &cfg,
        )
        .context("Failed to build game prediction agent")?,
    );
    let twitter_agent = Arc::new(
        TwitterAgent::new(Arc::clone(&client), &cfg)
            .context("Failed to build twitter agent")?,
    );

    // 每日定时预测
    let scheduler = TokioScheduler::new();
    player_agent.schedule_daily(
        &scheduler,
        cfg.predictions.daily_hour,
        cfg.predictions.daily_minute,
    );
    scheduler.start();

    let agents: Vec<Arc<dyn Agent>> = vec![player_agent, game_agent, twitter_agent];
    let agency = Agency::new(agents).context("Failed to build agency")?;

    let starting_prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "post a tweet about tonight's NBA predictions".to_string());

    let results = agency.run(&starting_prompt).await;
    for result in results {
        match result {
            Ok(output) => println!("{output}"),
            Err(e) => eprintln!("worker failed: {e}"),
        }
    }

    scheduler.shutdown();
    Ok(())
}
