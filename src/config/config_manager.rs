// ==========================================
// 饲料装车看板 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::kanban_config::{config_keys, KanbanConfig};
use crate::db::open_sqlite_connection;
use crate::engine::permission::SectorPermissionOracle;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_table()?;
        Ok(manager)
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        let manager = Self { conn };
        manager.ensure_table()?;
        Ok(manager)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
              scope_id TEXT NOT NULL,
              key TEXT NOT NULL,
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL DEFAULT (datetime('now')),
              PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        debug!(key, value, "配置已写入");
        Ok(())
    }

    /// 全部 global 配置（按键排序）
    pub fn list_global_config(&self) -> RepositoryResult<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_parsed_or<T: FromStr>(&self, key: &str, default: T) -> RepositoryResult<T> {
        match self.get_global_config_value(key)? {
            Some(raw) => raw.trim().parse::<T>().map_err(|_| RepositoryError::FieldValueError {
                field: key.to_string(),
                message: format!("无法解析配置值: {}", raw),
            }),
            None => Ok(default),
        }
    }

    // ===== 看板配置 =====

    /// 读取看板运行参数（缺失键使用默认值,非法值报错）
    pub fn load_kanban_config(&self) -> RepositoryResult<KanbanConfig> {
        let defaults = KanbanConfig::default();
        let config = KanbanConfig {
            cycle_start_hour: self
                .get_parsed_or(config_keys::CYCLE_START_HOUR, defaults.cycle_start_hour)?,
            cycle_window_count: self
                .get_parsed_or(config_keys::CYCLE_WINDOW_COUNT, defaults.cycle_window_count)?,
            cycle_target_tonnes: self
                .get_parsed_or(config_keys::CYCLE_TARGET_TONNES, defaults.cycle_target_tonnes)?,
            cycle_utc_offset_minutes: self.get_parsed_or(
                config_keys::CYCLE_UTC_OFFSET_MINUTES,
                defaults.cycle_utc_offset_minutes,
            )?,
            sack_weight_kg: self
                .get_parsed_or(config_keys::SACK_WEIGHT_KG, defaults.sack_weight_kg)?,
        };
        config.validate().map_err(RepositoryError::ValidationError)?;
        Ok(config)
    }

    /// 构建部门权限预言机
    ///
    /// 配置格式为 JSON: {"logistics": ["awaiting-entry", ...], ...}
    /// 未配置时使用标准权限表
    pub fn sector_permission_oracle(&self) -> RepositoryResult<SectorPermissionOracle> {
        let raw = match self.get_global_config_value(config_keys::SECTOR_PERMISSIONS)? {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(SectorPermissionOracle::standard()),
        };

        let map: HashMap<String, Vec<String>> = serde_json::from_str(&raw)?;
        SectorPermissionOracle::from_map(&map).map_err(|message| RepositoryError::FieldValueError {
            field: config_keys::SECTOR_PERMISSIONS.to_string(),
            message,
        })
    }
}
