#[cfg(test)]
mod tests {
    use crate::parallel::{join_ordered, ParallelConfig};
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_parallel_config_creation() {
        let config = ParallelConfig::default();
        assert!(config.max_concurrency.is_none());
        assert!(!config.fail_fast);

        let config = ParallelConfig::with_max_concurrency(5).with_fail_fast();
        assert_eq!(config.max_concurrency, Some(5));
        assert!(config.fail_fast);

        let config = ParallelConfig::fail_fast().max_concurrency(2);
        assert_eq!(config.max_concurrency, Some(2));
    }

    #[tokio::test]
    async fn test_parallel_config_deserialize() {
        let config: ParallelConfig =
            serde_json::from_str(r#"{"max_concurrency": 4}"#).unwrap();
        assert_eq!(config, ParallelConfig::with_max_concurrency(4));
    }

    #[tokio::test]
    async fn test_join_ordered_keeps_input_order() {
        let delays = [30u64, 10, 20];
        let outputs = join_ordered(
            &ParallelConfig::default(),
            delays.iter().map(|&ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                anyhow::Ok(ms)
            }),
        )
        .await
        .unwrap();
        assert_eq!(outputs, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_join_ordered_runs_every_sibling() {
        let finished = AtomicUsize::new(0);
        let finished = &finished;
        let result = join_ordered(
            &ParallelConfig::default(),
            (0..4).map(|i| async move {
                tokio::time::sleep(Duration::from_millis(5 * i)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                if i == 1 || i == 3 {
                    Err(anyhow!("item {i} failed"))
                } else {
                    Ok(i)
                }
            }),
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "item 1 failed");
        assert_eq!(finished.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_join_ordered_with_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (in_flight, peak) = (&in_flight, &peak);

        let outputs = join_ordered(
            &ParallelConfig::with_max_concurrency(2),
            (0..6).map(|i| async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                anyhow::Ok(i * 2)
            }),
        )
        .await
        .unwrap();

        assert_eq!(outputs, vec![0, 2, 4, 6, 8, 10]);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_join_ordered_fail_fast() {
        let finished = AtomicUsize::new(0);
        let finished = &finished;
        let result = join_ordered(
            &ParallelConfig::fail_fast(),
            [0u64, 200].into_iter().map(|ms| async move {
                if ms == 0 {
                    return Err(anyhow!("fast failure"));
                }
                tokio::time::sleep(Duration::from_millis(ms)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(ms)
            }),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
