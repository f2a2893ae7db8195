use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

use chrono::{Duration, NaiveDate};
use stake_projector::{
    EmissionSchedule, HttpRewardOracle, OracleConfig, ProjectorError, RewardMap, RewardOracle,
    SimulationOutcome, SimulationParameters, SimulationRequest, StakeRewardProjector,
    ValidationError,
};

fn network() -> SimulationParameters {
    SimulationParameters {
        reward_period_days: 30,
        target_seconds_per_block: 300.0,
        ticket_expiry_blocks: 40_960,
        ticket_maturity_blocks: 256,
        coinbase_maturity_blocks: 256,
        tickets_per_block: 5,
        actual_ticket_price: 250.0,
        pool_size: 41_000,
        pool_value: 10_250_000.0,
        current_block_height: 900_000,
        current_coin_supply: 16_500_000.0,
        as_of: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
    }
}

/// Serve `connections` reward requests, paying `reward` at every requested
/// height except those listed in `withheld`.
fn spawn_reward_server(reward: f64, withheld: Vec<u64>, connections: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming().take(connections) {
            let mut stream = stream.unwrap();
            let mut request_line = String::new();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or_default();
            let list = path.rsplit('/').next().unwrap_or_default();
            let entries: Vec<String> = list
                .split(',')
                .filter_map(|h| h.parse::<u64>().ok())
                .filter(|h| !withheld.contains(h))
                .map(|h| format!("\"{}\": {}", h, reward))
                .collect();
            let body = format!("{{{}}}", entries.join(","));

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });

    format!("http://{}", addr)
}

fn http_oracle(base_url: String) -> HttpRewardOracle {
    HttpRewardOracle::new(OracleConfig {
        base_url,
        reward_path: "/api/block/rewards/".to_string(),
        timeout_secs: 5,
        cache_ttl_secs: 60,
    })
    .unwrap()
}

#[tokio::test]
async fn http_projection_covers_the_requested_window() {
    let oracle = http_oracle(spawn_reward_server(0.9, vec![], 1));
    let projector =
        StakeRewardProjector::new(network(), EmissionSchedule::default(), oracle, Duration::seconds(60)).unwrap();

    let start = network().as_of;
    let request = SimulationRequest::new(1_000.0, start, start + Duration::days(90));
    let result = projector.simulate(&request).await.unwrap().into_result().unwrap();

    assert!(result.roi_percent > 0.0 && result.roi_percent < 15.0);
    assert_eq!(result.roi_amount, result.roi_percent * 1_000.0 / 100.0);
    assert_eq!(result.ledger.last().unwrap().simulated_day, 90.0);
}

#[tokio::test]
async fn withheld_heights_are_skipped_not_zeroed() {
    let params = network();
    let emission = EmissionSchedule::default();
    let start = params.as_of;
    let request = SimulationRequest::new(1_000.0, start, start + Duration::days(180));

    let plan = stake_projector::SimulationPlan::prepare(&request, &params, &emission).unwrap();
    let first_checkpoint = plan.checkpoints()[0];

    let oracle = http_oracle(spawn_reward_server(0.9, vec![first_checkpoint], 1));
    let rewards = oracle.fetch_rewards(&plan.checkpoints()).await.unwrap();
    assert!(!rewards.contains_key(&first_checkpoint));
    assert_eq!(rewards.len(), plan.checkpoints().len() - 1);

    let result = plan.run(&rewards);
    assert!(result.ledger.iter().all(|s| s.simulated_block != first_checkpoint));
}

#[tokio::test]
async fn unreachable_oracle_fails_the_run() {
    // Bind then drop to get a port nothing listens on
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let oracle = http_oracle(format!("http://{}", addr));
    let projector =
        StakeRewardProjector::new(network(), EmissionSchedule::default(), oracle, Duration::seconds(60)).unwrap();

    let start = network().as_of;
    let request = SimulationRequest::new(1_000.0, start, start + Duration::days(90));
    let err = projector.simulate(&request).await.unwrap_err();
    assert!(matches!(err, ProjectorError::OracleFetch(_)));
}

struct StaticOracle(f64);

impl RewardOracle for StaticOracle {
    async fn fetch_rewards(&self, heights: &[u64]) -> stake_projector::Result<RewardMap> {
        Ok(heights.iter().map(|h| (*h, self.0)).collect())
    }
}

#[tokio::test]
async fn boundary_duration_is_accepted_and_shorter_is_not() {
    let projector = StakeRewardProjector::new(
        network(),
        EmissionSchedule::default(),
        StaticOracle(0.9),
        Duration::seconds(60),
    )
    .unwrap();
    let start = network().as_of - Duration::days(45);

    let exact = SimulationRequest::new(500.0, start, start + Duration::days(30));
    assert!(matches!(
        projector.simulate(&exact).await.unwrap(),
        SimulationOutcome::Completed(_)
    ));

    let short = SimulationRequest::new(500.0, start, start + Duration::days(29));
    let err = projector.simulate(&short).await.unwrap_err();
    assert!(matches!(
        err,
        ProjectorError::Validation(ValidationError::DurationTooShort { days: 29, minimum: 30 })
    ));
}

#[tokio::test]
async fn repeated_runs_serialize_identically() {
    let projector = StakeRewardProjector::new(
        network(),
        EmissionSchedule::default(),
        StaticOracle(0.8),
        Duration::seconds(60),
    )
    .unwrap();
    let start = network().as_of + Duration::days(10);
    let request = SimulationRequest::new(12_345.0, start, start + Duration::days(730));

    let first = projector.simulate(&request).await.unwrap().into_result().unwrap();
    let second = projector.simulate(&request).await.unwrap().into_result().unwrap();
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}
