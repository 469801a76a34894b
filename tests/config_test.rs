// ==========================================
// 配置管理器测试
// ==========================================
// 职责: 验证看板配置读取、默认值、非法值与权限覆写
// ==========================================


#[cfg(test)]
mod config_test {
    use feed_cargo_kanban::app::AppState;
    use feed_cargo_kanban::config::{config_keys, ConfigManager, KanbanConfig};
    use feed_cargo_kanban::domain::CargoStatus;
    use feed_cargo_kanban::engine::{PermissionOracle, SECTOR_GATEHOUSE};
    use feed_cargo_kanban::repository::RepositoryError;

    use crate::test_helpers::{create_test_db, manual_clock};

    #[test]
    fn test_defaults_when_table_empty() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let manager = ConfigManager::new(&db_path).unwrap();

        assert_eq!(manager.load_kanban_config().unwrap(), KanbanConfig::default());
        assert!(manager.list_global_config().unwrap().is_empty());
    }

    #[test]
    fn test_overrides_are_applied() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let manager = ConfigManager::new(&db_path).unwrap();

        manager
            .set_global_config_value(config_keys::CYCLE_START_HOUR, "6")
            .unwrap();
        manager
            .set_global_config_value(config_keys::CYCLE_TARGET_TONNES, "80.5")
            .unwrap();
        manager
            .set_global_config_value(config_keys::CYCLE_START_HOUR, "7")
            .unwrap();

        let config = manager.load_kanban_config().unwrap();
        assert_eq!(config.cycle_start_hour, 7);
        assert_eq!(config.cycle_target_tonnes, 80.5);
        assert_eq!(config.cycle_window_count, 7);
        assert_eq!(manager.list_global_config().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let manager = ConfigManager::new(&db_path).unwrap();

        manager
            .set_global_config_value(config_keys::SACK_WEIGHT_KG, "heavy")
            .unwrap();
        assert!(matches!(
            manager.load_kanban_config(),
            Err(RepositoryError::FieldValueError { .. })
        ));

        manager
            .set_global_config_value(config_keys::SACK_WEIGHT_KG, "0")
            .unwrap();
        assert!(matches!(
            manager.load_kanban_config(),
            Err(RepositoryError::ValidationError(_))
        ));
    }

    #[test]
    fn test_sector_permission_override() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let manager = ConfigManager::new(&db_path).unwrap();

        let standard = manager.sector_permission_oracle().unwrap();
        assert!(standard
            .permitted_view(SECTOR_GATEHOUSE)
            .contains(&CargoStatus::Invoiced));

        manager
            .set_global_config_value(
                config_keys::SECTOR_PERMISSIONS,
                r#"{"gatehouse": ["awaiting-entry", "awaiting-loading"], "weighbridge": ["loaded"]}"#,
            )
            .unwrap();
        let custom = manager.sector_permission_oracle().unwrap();
        assert_eq!(custom.permitted_view(SECTOR_GATEHOUSE).len(), 2);
        assert_eq!(custom.permitted_view("weighbridge").len(), 1);

        manager
            .set_global_config_value(config_keys::SECTOR_PERMISSIONS, r#"{"gatehouse": ["weighed"]}"#)
            .unwrap();
        assert!(manager.sector_permission_oracle().is_err());

        manager
            .set_global_config_value(config_keys::SECTOR_PERMISSIONS, "not json")
            .unwrap();
        assert!(matches!(
            manager.sector_permission_oracle(),
            Err(RepositoryError::SerializationError(_))
        ));
    }

    #[test]
    fn test_app_state_wires_config_and_restores() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        {
            let manager = ConfigManager::new(&db_path).unwrap();
            manager
                .set_global_config_value(config_keys::CYCLE_WINDOW_COUNT, "3")
                .unwrap();
        }

        let state = AppState::with_clock(db_path.clone(), manual_clock()).unwrap();
        assert_eq!(state.config.cycle_window_count, 3);
        let report = state
            .kanban_api
            .report(Default::default())
            .unwrap();
        assert_eq!(report.cycles.len(), 3);

        let mut queue = feed_cargo_kanban::PreparationQueue::new();
        queue
            .add_draft("4521", 12_000.0, None, feed_cargo_kanban::FleetType::Owned)
            .unwrap();
        state
            .kanban_api
            .dispatch_from_queue(&mut queue, &crate::test_helpers::logistics())
            .unwrap();
        state.kanban_api.save_snapshot().unwrap();
        drop(state);

        let reopened = AppState::with_clock(db_path, manual_clock()).unwrap();
        assert_eq!(reopened.kanban_api.snapshot().unwrap().cargo_records.len(), 1);
    }

    #[test]
    fn test_demo_seed_saves_only_once() {
        let (_temp_file, db_path) = create_test_db().unwrap();

        let state = AppState::with_clock(db_path.clone(), manual_clock()).unwrap();
        let seeded = state.seed_demo_if_empty().unwrap();
        assert!(seeded.is_some());
        assert_eq!(state.kanban_api.snapshot().unwrap().cargo_records.len(), 3);
        assert_eq!(state.kanban_api.list_demands(None).unwrap().len(), 1);

        assert!(state.seed_demo_if_empty().unwrap().is_none());
        drop(state);

        // 重开后从快照恢复,非空看板不再写入快照
        let reopened = AppState::with_clock(db_path, manual_clock()).unwrap();
        assert!(reopened.seed_demo_if_empty().unwrap().is_none());
        let metas = reopened.snapshot_repo.list(10).unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(Some(metas[0].snapshot_id.clone()), seeded);
    }
}
