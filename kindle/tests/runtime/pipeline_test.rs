use crate::helpers::{
    init_tracing, received, wait_until, BrokenDistributor, CollectingDistributor,
    DoublingProcessor, GatedProcessor, OddFailingProcessor, PanickingLoader, StalledLoader,
    VecLoader,
};
use kindle::{
    ErrorPolicy, PipelineConfig, PipelineError, PipelineFactory, ShutdownPolicy, StageKind,
    StartupParameters, WorkerState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const PATIENCE: Duration = Duration::from_secs(5);

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn it_should_deliver_every_item_in_order() {
        // Given
        init_tracing();
        let distributor = CollectingDistributor::default();
        let values = Arc::clone(&distributor.received);
        let mut pipeline = PipelineFactory::with_processor(DoublingProcessor)
            .processor_queue_bound(1)
            .distributor_queue_bound(1)
            .loader(VecLoader::new(vec![1, 2, 3]))
            .distributor(distributor)
            .build();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        let delivered = wait_until(PATIENCE, || received(&values).len() == 3).await;
        let stopped = pipeline.stop().await;

        // Then
        assert!(delivered);
        assert!(stopped.is_ok());
        assert_eq!(received(&values), vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn it_should_hold_the_loader_back_while_the_queue_is_full() {
        // Given
        let (open, gate) = watch::channel(false);
        let loader = VecLoader::new((1..=10).collect());
        let loaded = Arc::clone(&loader.loaded);
        let distributor = CollectingDistributor::default();
        let values = Arc::clone(&distributor.received);
        let mut pipeline = PipelineFactory::with_processor(GatedProcessor {
            gate,
            finalised: Arc::new(AtomicUsize::new(0)),
        })
        .processor_queue_bound(1)
        .loader(loader)
        .distributor(distributor)
        .build();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        // One item held by the processor, one queued, one waiting to enqueue
        let stalled = wait_until(PATIENCE, || loaded.load(Ordering::SeqCst) == 3).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Then
        assert!(stalled);
        assert_eq!(loaded.load(Ordering::SeqCst), 3);
        assert!(pipeline.processor_queue_count() <= 1);
        assert!(received(&values).is_empty());

        open.send(true).unwrap();
        let delivered = wait_until(PATIENCE, || received(&values).len() == 10).await;
        pipeline.stop().await.unwrap();
        assert!(delivered);
        assert_eq!(loaded.load(Ordering::SeqCst), 10);
        assert_eq!(
            received(&values),
            (1..=10).map(|value| value * 2).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn it_should_drain_queued_items_on_shutdown() {
        // Given
        init_tracing();
        let (open, gate) = watch::channel(false);
        let finalised = Arc::new(AtomicUsize::new(0));
        let distributor = CollectingDistributor::default();
        let values = Arc::clone(&distributor.received);
        let config = PipelineConfig::default()
            .with_processor_queue_bound(8)
            .with_shutdown_policy(ShutdownPolicy::AllStages);
        let mut pipeline = PipelineFactory::with_processor(GatedProcessor {
            gate,
            finalised: Arc::clone(&finalised),
        })
        .config(config)
        .loader(VecLoader::new((1..=6).collect()))
        .distributor(distributor)
        .build();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        // One item is held inside the gated processor, the rest wait in the queue
        let queued = wait_until(PATIENCE, || pipeline.processor_queue_count() == 5).await;
        pipeline.shutdown_token().cancel();
        open.send(true).unwrap();
        let stopped = pipeline.stop().await;

        // Then
        assert!(queued);
        assert!(stopped.is_ok());
        assert_eq!(received(&values), vec![2, 4, 6, 8, 10, 12]);
        assert_eq!(pipeline.processor_queue_count(), 0);
        assert_eq!(pipeline.distributor_queue_count(), 0);
        assert_eq!(finalised.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.state(StageKind::Processor), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn it_should_run_with_default_stages() {
        // Given
        let mut pipeline = PipelineFactory::<u32, u32>::new().build();

        // When
        let started = pipeline.start(StartupParameters::new()).await;
        let stopped = pipeline.stop().await;

        // Then
        assert!(started.is_ok());
        assert!(stopped.is_ok());
        assert_eq!(pipeline.config().processor_queue_bound, 0);
        assert_eq!(pipeline.config().distributor_queue_bound, 0);
        assert!(!pipeline.is_running());
    }

    #[tokio::test]
    async fn it_should_report_stage_states() {
        // Given
        let mut pipeline = PipelineFactory::with_processor(DoublingProcessor)
            .loader(VecLoader::new(vec![]))
            .build();
        assert!(pipeline
            .states()
            .iter()
            .all(|(_, state)| *state == WorkerState::Idle));

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        let running = pipeline.states();
        pipeline.stop().await.unwrap();

        // Then
        assert!(running
            .iter()
            .all(|(_, state)| *state == WorkerState::Running));
        assert_eq!(
            pipeline.states(),
            [
                (StageKind::Loader, WorkerState::Stopped),
                (StageKind::Processor, WorkerState::Stopped),
                (StageKind::Distributor, WorkerState::Stopped),
            ]
        );
    }

    #[tokio::test]
    async fn it_should_fail_fast_when_a_stage_cannot_start() {
        // Given
        init_tracing();
        let mut pipeline = PipelineFactory::with_processor(DoublingProcessor)
            .loader(VecLoader::new((0..100).collect()))
            .distributor(BrokenDistributor)
            .build();

        // When
        let result = pipeline.start(StartupParameters::new()).await;

        // Then
        match result {
            Err(PipelineError::StartupFailure { stage, source }) => {
                assert_eq!(stage, StageKind::Distributor);
                assert_eq!(source.to_string(), "Test error: no connection");
            }
            other => panic!("expected a startup failure, got {other:?}"),
        }
        assert!(pipeline
            .states()
            .iter()
            .all(|(_, state)| *state == WorkerState::Stopped));
        assert!(!pipeline.is_running());
    }

    #[tokio::test]
    async fn it_should_not_wait_on_a_stalled_startup_when_another_stage_fails() {
        // Given
        init_tracing();
        let mut pipeline = PipelineFactory::with_processor(DoublingProcessor)
            .loader(StalledLoader)
            .distributor(BrokenDistributor)
            .build();

        // When
        let result = tokio::time::timeout(PATIENCE, pipeline.start(StartupParameters::new()))
            .await
            .expect("start should fail fast");

        // Then
        assert!(matches!(
            result,
            Err(PipelineError::StartupFailure {
                stage: StageKind::Distributor,
                ..
            })
        ));
        assert!(pipeline
            .states()
            .iter()
            .all(|(_, state)| *state == WorkerState::Stopped));
    }

    #[tokio::test]
    async fn it_should_stop_when_a_stage_panics() {
        // Given
        init_tracing();
        let distributor = CollectingDistributor::default();
        let finalised = Arc::clone(&distributor.finalised);
        let mut pipeline = PipelineFactory::with_processor(DoublingProcessor)
            .loader(PanickingLoader)
            .distributor(distributor)
            .build();
        pipeline.start(StartupParameters::new()).await.unwrap();

        // When
        let result = tokio::time::timeout(PATIENCE, pipeline.stop())
            .await
            .expect("stop should not hang after a panic");

        // Then
        assert!(matches!(
            result,
            Err(PipelineError::Join {
                stage: StageKind::Loader,
                ..
            })
        ));
        assert!(pipeline
            .states()
            .iter()
            .all(|(_, state)| *state == WorkerState::Stopped));
        assert_eq!(finalised.load(Ordering::SeqCst), 1);
        assert!(!pipeline.is_running());
    }

    #[tokio::test]
    async fn it_should_reject_a_second_start() {
        // Given
        let mut pipeline = PipelineFactory::<u32, u32>::new().build();
        pipeline.start(StartupParameters::new()).await.unwrap();

        // When
        let result = pipeline.start(StartupParameters::new()).await;

        // Then
        assert!(matches!(result, Err(PipelineError::AlreadyStarted)));
        pipeline.stop().await.unwrap();
    }

    #[tokio::test]
    async fn it_should_reject_stop_before_start() {
        // Given
        let mut pipeline = PipelineFactory::<u32, u32>::new().build();

        // When
        let result = pipeline.stop().await;

        // Then
        assert!(matches!(result, Err(PipelineError::NotStarted)));
    }

    #[tokio::test]
    async fn it_should_skip_failed_items_when_ignoring_errors() {
        // Given
        let distributor = CollectingDistributor::default();
        let values = Arc::clone(&distributor.received);
        let mut pipeline = PipelineFactory::with_processor(OddFailingProcessor { escalate: false })
            .config(PipelineConfig::default().with_error_policy(ErrorPolicy::Ignore))
            .loader(VecLoader::new(vec![1, 2, 3, 4]))
            .distributor(distributor)
            .build();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        let delivered = wait_until(PATIENCE, || received(&values).len() == 2).await;
        let stopped = pipeline.stop().await;

        // Then
        assert!(delivered);
        assert!(stopped.is_ok());
        assert_eq!(received(&values), vec![4, 8]);
    }

    #[tokio::test]
    async fn it_should_keep_running_when_logging_errors() {
        // Given
        init_tracing();
        let distributor = CollectingDistributor::default();
        let values = Arc::clone(&distributor.received);
        let mut pipeline = PipelineFactory::with_processor(OddFailingProcessor { escalate: false })
            .config(PipelineConfig::default().with_error_policy(ErrorPolicy::LogAndContinue))
            .loader(VecLoader::new(vec![5, 6, 7, 8]))
            .distributor(distributor)
            .build();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        let delivered = wait_until(PATIENCE, || received(&values).len() == 2).await;

        // Then
        assert!(delivered);
        assert!(pipeline.is_running());
        assert!(!pipeline.shutdown_token().is_cancelled());
        pipeline.stop().await.unwrap();
        assert_eq!(received(&values), vec![12, 16]);
    }

    #[tokio::test]
    async fn it_should_shut_down_when_an_error_escalates() {
        // Given
        init_tracing();
        let mut pipeline = PipelineFactory::with_processor(OddFailingProcessor { escalate: false })
            .config(PipelineConfig::default().with_error_policy(ErrorPolicy::Escalate))
            .loader(VecLoader::new(vec![2, 3, 4]))
            .distributor(CollectingDistributor::default())
            .build();
        let shutdown = pipeline.shutdown_token();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        let signalled = tokio::time::timeout(PATIENCE, shutdown.cancelled()).await;
        let result = pipeline.stop().await;

        // Then
        assert!(signalled.is_ok());
        match result {
            Err(PipelineError::ActionFailure { stage, source }) => {
                assert_eq!(stage, StageKind::Processor);
                assert_eq!(source.to_string(), "Test error: odd value 3");
            }
            other => panic!("expected an action failure, got {other:?}"),
        }
        assert!(!pipeline.is_running());
    }

    #[tokio::test]
    async fn it_should_let_the_plugin_override_the_error_policy() {
        // Given
        let mut pipeline = PipelineFactory::with_processor(OddFailingProcessor { escalate: true })
            .config(PipelineConfig::default().with_error_policy(ErrorPolicy::Ignore))
            .loader(VecLoader::new(vec![1]))
            .build();
        let shutdown = pipeline.shutdown_token();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        let signalled = tokio::time::timeout(PATIENCE, shutdown.cancelled()).await;
        let result = pipeline.join().await;

        // Then
        assert!(signalled.is_ok());
        assert_eq!(
            result.map_err(|e| e.stage()).unwrap_err(),
            Some(StageKind::Processor)
        );
    }

    #[tokio::test]
    async fn it_should_cascade_shutdown_from_the_loader() {
        // Given
        let loader = VecLoader::new((0..500).collect());
        let loaded = Arc::clone(&loader.loaded);
        let distributor = CollectingDistributor::default();
        let values = Arc::clone(&distributor.received);
        let finalised = Arc::clone(&distributor.finalised);
        let mut pipeline = PipelineFactory::with_processor(DoublingProcessor)
            .config(
                PipelineConfig::default()
                    .with_processor_queue_bound(4)
                    .with_shutdown_policy(ShutdownPolicy::LoaderOnly),
            )
            .loader(loader)
            .distributor(distributor)
            .build();

        // When
        pipeline.start(StartupParameters::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stopped = pipeline.stop().await;

        // Then
        assert!(stopped.is_ok());
        let values = received(&values);
        assert_eq!(values.len(), loaded.load(Ordering::SeqCst));
        assert!(values.iter().zip(0..).all(|(value, i)| *value == i * 2));
        assert_eq!(finalised.load(Ordering::SeqCst), 1);
        assert!(!pipeline.is_running());
    }
}
