// ==========================================
// 看板快照仓储测试
// ==========================================
// 职责: 验证快照保存/读取/列表,以及经 API 的保存与恢复
// ==========================================


#[cfg(test)]
mod snapshot_repository_test {
    use chrono::Duration;
    use feed_cargo_kanban::api::ApiError;
    use feed_cargo_kanban::domain::{CargoStatus, DemandPriority, FleetType, RationPayload};
    use feed_cargo_kanban::repository::{KanbanSnapshotRepository, RepositoryError};
    use std::sync::Arc;

    use crate::test_helpers::{
        api_with_clock, create_test_db, draft, engine_with_clock, logistics, manual_clock,
    };

    #[test]
    fn test_save_and_load_latest() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repo = KanbanSnapshotRepository::new(&db_path).unwrap();
        assert!(repo.load_latest().unwrap().is_none());

        let clock = manual_clock();
        let mut engine = engine_with_clock(clock.clone());
        engine
            .dispatch_batch(vec![draft("C1", 1000.0, FleetType::Owned, 1)])
            .unwrap();
        let first_id = repo.save(&engine.snapshot()).unwrap();

        clock.advance(Duration::minutes(20));
        engine
            .apply_transition(
                "C1",
                "awaiting-ration",
                &logistics(),
                Some(RationPayload::new("Starter Feed", 10, DemandPriority::Normal)),
            )
            .unwrap();
        let second_id = repo.save(&engine.snapshot()).unwrap();
        assert_ne!(first_id, second_id);

        let latest = repo.load_latest().unwrap().unwrap();
        assert_eq!(latest.cargo_records[0].status, CargoStatus::AwaitingRation);
        assert_eq!(latest.ration_demands.len(), 1);

        let first = repo.find_by_id(&first_id).unwrap();
        assert_eq!(first.cargo_records[0].status, CargoStatus::AwaitingLoading);
        assert!(first.ration_demands.is_empty());

        let metas = repo.list(10).unwrap();
        assert_eq!(metas.len(), 2);
        assert_eq!(metas[0].snapshot_id, second_id);
        assert_eq!(metas[0].demand_count, 1);
        assert_eq!(metas[1].cargo_count, 1);
        assert_eq!(repo.list(1).unwrap().len(), 1);
    }

    #[test]
    fn test_find_missing_snapshot() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repo = KanbanSnapshotRepository::new(&db_path).unwrap();
        assert!(matches!(
            repo.find_by_id("nope"),
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_api_save_then_restore_into_fresh_api() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repo = Arc::new(KanbanSnapshotRepository::new(&db_path).unwrap());

        let clock = manual_clock();
        let api = api_with_clock(clock.clone()).with_snapshot_repo(repo.clone());
        let mut queue = feed_cargo_kanban::PreparationQueue::new();
        queue
            .add_draft("4521", 30_000.0, None, FleetType::Contracted)
            .unwrap();
        let created = api.dispatch_from_queue(&mut queue, &logistics()).unwrap();
        clock.advance(Duration::minutes(45));
        api.move_cargo(&created[0].id, "loading", &logistics(), None)
            .unwrap();
        api.save_snapshot().unwrap();

        let fresh = api_with_clock(manual_clock()).with_snapshot_repo(repo);
        assert!(fresh.restore_latest().unwrap());
        let restored = fresh.get_cargo(&created[0].id).unwrap();
        assert_eq!(restored, api.get_cargo(&created[0].id).unwrap());
        assert_eq!(
            restored.duration_in(CargoStatus::AwaitingEntry),
            45 * 60 * 1000
        );
    }

    #[test]
    fn test_snapshot_ops_without_repo() {
        let api = api_with_clock(manual_clock());
        assert!(matches!(api.save_snapshot(), Err(ApiError::InternalError(_))));
        assert!(matches!(api.restore_latest(), Err(ApiError::InternalError(_))));
    }
}
