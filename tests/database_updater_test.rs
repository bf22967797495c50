/// データベース更新サービスのテスト
///
/// モックのデータベースとロガーを使い、変更の選択、トランザクション境界、
/// 常時実行スクリプト、失敗時の振る舞いを確認します。

#[cfg(test)]
mod database_updater_tests {
    use async_trait::async_trait;
    use schema_manager::core::config::UpdateOptions;
    use schema_manager::core::database::Database;
    use schema_manager::core::error::{DatabaseError, DiscoveryError, UpdateError};
    use schema_manager::core::logger::UpdateLogger;
    use schema_manager::core::schema_change::{InMemorySchemaChange, SchemaChange};
    use schema_manager::core::script::{InlineScript, SimpleScript};
    use schema_manager::core::version::DatabaseVersion;
    use schema_manager::services::always_run::{
        InMemoryAlwaysRunScriptProvider, ProvideAlwaysRunScripts,
    };
    use schema_manager::services::change_provider::{
        InMemorySchemaChangeProvider, ProvideSchemaChanges,
    };
    use schema_manager::services::database_updater::{DatabaseUpdater, COMMIT_MESSAGE};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// データベース呼び出しの記録
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Begin,
        Update(DatabaseVersion),
        Script(String),
        Commit,
        Rollback,
    }

    /// 呼び出しを記録するモックデータベース
    struct MockDatabase {
        revision: DatabaseVersion,
        revision_reads: AtomicUsize,
        calls: Mutex<Vec<Call>>,
        commits: AtomicUsize,
        fail_update_at: Option<DatabaseVersion>,
        fail_commit_at: Option<usize>,
        fail_script: Option<String>,
    }

    impl MockDatabase {
        fn at(revision: DatabaseVersion) -> Self {
            Self {
                revision,
                revision_reads: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
                commits: AtomicUsize::new(0),
                fail_update_at: None,
                fail_commit_at: None,
                fail_script: None,
            }
        }

        fn failing_update_at(mut self, version: DatabaseVersion) -> Self {
            self.fail_update_at = Some(version);
            self
        }

        /// n回目（1始まり）のコミットを失敗させる
        fn failing_commit_at(mut self, n: usize) -> Self {
            self.fail_commit_at = Some(n);
            self
        }

        fn failing_script(mut self, name: &str) -> Self {
            self.fail_script = Some(name.to_string());
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn updates(&self) -> Vec<DatabaseVersion> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Update(version) => Some(version),
                    _ => None,
                })
                .collect()
        }

        fn count(&self, expected: &Call) -> usize {
            self.calls().iter().filter(|call| *call == expected).count()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Database for MockDatabase {
        async fn revision(&self) -> Result<DatabaseVersion, DatabaseError> {
            self.revision_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.revision)
        }

        async fn execute_update(&self, change: &dyn SchemaChange) -> Result<(), DatabaseError> {
            self.record(Call::Update(change.version()));
            if self.fail_update_at == Some(change.version()) {
                return Err(DatabaseError::Query {
                    message: "syntax error".to_string(),
                    sql: Some(change.forward_script().read_sql()?),
                });
            }
            Ok(())
        }

        async fn execute_script(&self, script: &dyn SimpleScript) -> Result<(), DatabaseError> {
            self.record(Call::Script(script.name()));
            if self.fail_script.as_deref() == Some(script.name().as_str()) {
                return Err(DatabaseError::Query {
                    message: "view depends on missing table".to_string(),
                    sql: None,
                });
            }
            Ok(())
        }

        async fn begin_transaction(&self) -> Result<(), DatabaseError> {
            self.record(Call::Begin);
            Ok(())
        }

        async fn commit(&self) -> Result<(), DatabaseError> {
            self.record(Call::Commit);
            let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_commit_at == Some(n) {
                return Err(DatabaseError::Transaction {
                    message: "deadlock detected".to_string(),
                });
            }
            Ok(())
        }

        async fn rollback(&self) -> Result<(), DatabaseError> {
            self.record(Call::Rollback);
            Ok(())
        }
    }

    /// メッセージを記録するロガー
    #[derive(Default)]
    struct RecordingLogger {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingLogger {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }

        fn count(&self, message: &str) -> usize {
            self.messages().iter().filter(|m| *m == message).count()
        }
    }

    impl UpdateLogger for RecordingLogger {
        fn info(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    /// 呼び出し回数を数える変更プロバイダー
    struct CountingChangeProvider {
        inner: InMemorySchemaChangeProvider,
        calls: AtomicUsize,
    }

    impl CountingChangeProvider {
        fn new(changes: Vec<InMemorySchemaChange>) -> Self {
            Self {
                inner: InMemorySchemaChangeProvider::new(changes),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ProvideSchemaChanges for CountingChangeProvider {
        fn get_all_changes(&self) -> Result<Vec<Box<dyn SchemaChange>>, DiscoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_all_changes()
        }
    }

    /// 呼び出し回数を数える常時実行スクリプトプロバイダー
    struct CountingAlwaysRunProvider {
        inner: InMemoryAlwaysRunScriptProvider,
        calls: AtomicUsize,
        unreadable: bool,
    }

    impl CountingAlwaysRunProvider {
        fn new(names: &[&str]) -> Self {
            let scripts = names
                .iter()
                .map(|name| InlineScript::new(*name, "SELECT 1;"))
                .collect();
            Self {
                inner: InMemoryAlwaysRunScriptProvider::new(scripts),
                calls: AtomicUsize::new(0),
                unreadable: false,
            }
        }

        fn unreadable() -> Self {
            Self {
                unreadable: true,
                ..Self::new(&[])
            }
        }
    }

    impl ProvideAlwaysRunScripts for CountingAlwaysRunProvider {
        fn get_scripts(&self) -> Result<Vec<Box<dyn SimpleScript>>, DiscoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unreadable {
                return Err(DiscoveryError::Io {
                    path: PathBuf::from("AlwaysRun"),
                    cause: "Not a directory (os error 20)".to_string(),
                });
            }
            self.inner.get_scripts()
        }
    }

    struct Harness {
        changes: Arc<CountingChangeProvider>,
        always_run: Arc<CountingAlwaysRunProvider>,
        database: Arc<MockDatabase>,
        logger: Arc<RecordingLogger>,
    }

    impl Harness {
        fn new(
            changes: Vec<InMemorySchemaChange>,
            scripts: &[&str],
            database: MockDatabase,
        ) -> Self {
            Self {
                changes: Arc::new(CountingChangeProvider::new(changes)),
                always_run: Arc::new(CountingAlwaysRunProvider::new(scripts)),
                database: Arc::new(database),
                logger: Arc::new(RecordingLogger::default()),
            }
        }

        fn updater(&self, options: UpdateOptions) -> DatabaseUpdater {
            DatabaseUpdater::new(
                self.changes.clone(),
                self.always_run.clone(),
                self.database.clone(),
                self.logger.clone(),
                options,
            )
        }
    }

    fn v(major: u32, minor: u32, point: u32, step: u32) -> DatabaseVersion {
        DatabaseVersion::new(major, minor, point, step)
    }

    fn change(previous: DatabaseVersion, version: DatabaseVersion) -> InMemorySchemaChange {
        InMemorySchemaChange::new(
            previous,
            version,
            format!("CREATE TABLE t_{} (id INTEGER);", version.step),
            format!("DROP TABLE t_{};", version.step),
        )
    }

    fn chain() -> Vec<InMemorySchemaChange> {
        vec![
            change(v(0, 0, 0, 0), v(1, 0, 0, 1)),
            change(v(1, 0, 0, 1), v(1, 0, 0, 2)),
            change(v(1, 0, 0, 2), v(1, 0, 0, 3)),
        ]
    }

    /// 変更がない場合でも検出とリビジョン取得が行われ、常時実行スクリプトが1回ずつ実行されることを確認
    #[tokio::test]
    async fn test_no_pending_changes_runs_always_run_scripts() {
        let harness = Harness::new(vec![], &["views", "grants"], MockDatabase::at(v(0, 0, 0, 0)));

        let report = harness.updater(UpdateOptions::new()).apply_updates().await.unwrap();

        assert_eq!(harness.changes.calls.load(Ordering::SeqCst), 1);
        assert_eq!(harness.database.revision_reads.load(Ordering::SeqCst), 1);
        assert!(harness.database.updates().is_empty());
        assert_eq!(harness.database.count(&Call::Script("views".to_string())), 1);
        assert_eq!(harness.database.count(&Call::Script("grants".to_string())), 1);
        assert_eq!(harness.always_run.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.always_run_count, 2);
        assert!(!harness.logger.messages().is_empty());
    }

    /// 未適用の変更が1つある場合に1回だけ適用されることを確認
    #[tokio::test]
    async fn test_out_of_date_database_applies_change() {
        let harness = Harness::new(
            vec![change(v(0, 0, 0, 0), v(1, 0, 0, 0))],
            &[],
            MockDatabase::at(v(0, 0, 0, 0)),
        );

        let report = harness.updater(UpdateOptions::new()).apply_updates().await.unwrap();

        assert_eq!(harness.database.updates(), vec![v(1, 0, 0, 0)]);
        assert_eq!(
            harness
                .logger
                .count("Applying update for database version 1.0.0.0..."),
            1
        );
        assert_eq!(report.applied, vec![v(1, 0, 0, 0)]);
        assert_eq!(report.final_revision(), v(1, 0, 0, 0));
    }

    /// データベースが最新の場合は変更が適用されないことを確認
    #[tokio::test]
    async fn test_current_database_applies_nothing() {
        let harness = Harness::new(
            vec![change(v(0, 0, 0, 0), v(1, 0, 0, 0))],
            &[],
            MockDatabase::at(v(1, 0, 0, 0)),
        );

        let report = harness.updater(UpdateOptions::new()).apply_updates().await.unwrap();

        assert!(harness.database.updates().is_empty());
        assert!(report.applied.is_empty());
        assert_eq!(report.final_revision(), v(1, 0, 0, 0));
    }

    /// 途中のリビジョンから残りの変更だけが適用されることを確認
    #[tokio::test]
    async fn test_only_newer_changes_are_applied() {
        let harness = Harness::new(chain(), &[], MockDatabase::at(v(1, 0, 0, 1)));

        harness.updater(UpdateOptions::new()).apply_updates().await.unwrap();

        assert_eq!(harness.database.updates(), vec![v(1, 0, 0, 2), v(1, 0, 0, 3)]);
    }

    /// 上限バージョン0.0.0.0では何も適用されないことを確認
    #[tokio::test]
    async fn test_zero_target_applies_nothing() {
        let harness = Harness::new(
            vec![change(v(0, 0, 0, 0), v(1, 0, 0, 0))],
            &[],
            MockDatabase::at(v(0, 0, 0, 0)),
        );
        let options = UpdateOptions::new().with_target_revision(Some(DatabaseVersion::ZERO));

        harness.updater(options).apply_updates().await.unwrap();

        assert!(harness.database.updates().is_empty());
    }

    /// 上限バージョンまでの変更だけが適用されることを確認
    #[tokio::test]
    async fn test_target_revision_is_inclusive_ceiling() {
        let harness = Harness::new(chain(), &[], MockDatabase::at(v(0, 0, 0, 0)));
        let options = UpdateOptions::new().with_target_revision(Some(v(1, 0, 0, 2)));

        let report = harness.updater(options).apply_updates().await.unwrap();

        assert_eq!(report.applied, vec![v(1, 0, 0, 1), v(1, 0, 0, 2)]);
    }

    /// 増分モードでは変更ごとにコミットされることを確認
    #[tokio::test]
    async fn test_incremental_mode_commits_per_change() {
        let harness = Harness::new(chain(), &[], MockDatabase::at(v(0, 0, 0, 0)));
        let options = UpdateOptions::new().with_incremental_transactions(true);

        harness.updater(options).apply_updates().await.unwrap();

        assert_eq!(harness.logger.count(COMMIT_MESSAGE), 3);
        assert_eq!(harness.database.count(&Call::Commit), 3);
        assert_eq!(
            harness.database.calls(),
            vec![
                Call::Begin,
                Call::Update(v(1, 0, 0, 1)),
                Call::Commit,
                Call::Begin,
                Call::Update(v(1, 0, 0, 2)),
                Call::Commit,
                Call::Begin,
                Call::Update(v(1, 0, 0, 3)),
                Call::Commit,
            ]
        );
    }

    /// 一括モードではコミットが最大1回であることを確認
    #[tokio::test]
    async fn test_batch_mode_commits_at_most_once() {
        let harness = Harness::new(chain(), &["views"], MockDatabase::at(v(0, 0, 0, 0)));

        harness.updater(UpdateOptions::new()).apply_updates().await.unwrap();

        assert_eq!(harness.logger.count(COMMIT_MESSAGE), 1);
        assert_eq!(
            harness.database.calls(),
            vec![
                Call::Begin,
                Call::Update(v(1, 0, 0, 1)),
                Call::Update(v(1, 0, 0, 2)),
                Call::Update(v(1, 0, 0, 3)),
                Call::Commit,
                Call::Script("views".to_string()),
            ]
        );
    }

    /// 一括モードで変更がない場合はトランザクションを開始しないことを確認
    #[tokio::test]
    async fn test_batch_mode_without_changes_opens_no_transaction() {
        let harness = Harness::new(vec![], &[], MockDatabase::at(v(0, 0, 0, 0)));

        harness.updater(UpdateOptions::new()).apply_updates().await.unwrap();

        assert_eq!(harness.logger.count(COMMIT_MESSAGE), 0);
        assert!(harness.database.calls().is_empty());
    }

    /// 一括モードの失敗時にロールバックされ、常時実行スクリプトが実行されないことを確認
    #[tokio::test]
    async fn test_batch_failure_rolls_back_and_skips_always_run() {
        let harness = Harness::new(
            chain(),
            &["views"],
            MockDatabase::at(v(0, 0, 0, 0)).failing_update_at(v(1, 0, 0, 2)),
        );

        let err = harness
            .updater(UpdateOptions::new())
            .apply_updates()
            .await
            .unwrap_err();

        assert!(err.is_execution());
        assert_eq!(err.last_applied(), None);
        assert_eq!(harness.database.count(&Call::Rollback), 1);
        assert_eq!(harness.database.count(&Call::Commit), 0);
        assert_eq!(harness.database.updates(), vec![v(1, 0, 0, 1), v(1, 0, 0, 2)]);
        assert_eq!(harness.database.count(&Call::Script("views".to_string())), 0);
        assert!(err.to_string().contains("1.0.0.2"));
    }

    /// 増分モードの失敗時に確定済みの最終バージョンが報告されることを確認
    #[tokio::test]
    async fn test_incremental_failure_reports_last_committed_version() {
        let harness = Harness::new(
            chain(),
            &["views"],
            MockDatabase::at(v(0, 0, 0, 0)).failing_update_at(v(1, 0, 0, 3)),
        );
        let options = UpdateOptions::new().with_incremental_transactions(true);

        let err = harness.updater(options).apply_updates().await.unwrap_err();

        assert!(err.is_execution());
        assert_eq!(err.last_applied(), Some(v(1, 0, 0, 2)));
        assert_eq!(harness.database.count(&Call::Commit), 2);
        assert_eq!(harness.database.count(&Call::Rollback), 1);
        assert_eq!(harness.database.count(&Call::Script("views".to_string())), 0);
    }

    /// 常時実行スクリプトを検出できない場合はデータベースに触れずに失敗することを確認
    #[tokio::test]
    async fn test_always_run_discovery_failure_touches_nothing() {
        let harness = Harness {
            always_run: Arc::new(CountingAlwaysRunProvider::unreadable()),
            ..Harness::new(
                vec![change(v(0, 0, 0, 0), v(1, 0, 0, 0))],
                &[],
                MockDatabase::at(v(0, 0, 0, 0)),
            )
        };

        let err = harness
            .updater(UpdateOptions::new().with_incremental_transactions(true))
            .apply_updates()
            .await
            .unwrap_err();

        assert!(err.is_discovery());
        assert_eq!(err.last_applied(), None);
        assert_eq!(harness.database.revision_reads.load(Ordering::SeqCst), 0);
        assert!(harness.database.calls().is_empty());
    }

    /// 増分モードでコミットに失敗した場合に以降の変更が適用されないことを確認
    #[tokio::test]
    async fn test_incremental_commit_failure_stops_run() {
        let harness = Harness::new(
            chain(),
            &["views"],
            MockDatabase::at(v(0, 0, 0, 0)).failing_commit_at(2),
        );
        let options = UpdateOptions::new().with_incremental_transactions(true);

        let err = harness.updater(options).apply_updates().await.unwrap_err();

        match &err {
            UpdateError::Execution {
                failed_version,
                last_applied,
                source,
            } => {
                assert_eq!(*failed_version, v(1, 0, 0, 2));
                assert_eq!(*last_applied, Some(v(1, 0, 0, 1)));
                assert!(source.is_transaction());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(harness.database.updates(), vec![v(1, 0, 0, 1), v(1, 0, 0, 2)]);
        assert_eq!(harness.database.count(&Call::Script("views".to_string())), 0);
    }

    /// 一括モードでコミットに失敗した場合に確定済みバージョンがなく常時実行スクリプトも実行されないことを確認
    #[tokio::test]
    async fn test_batch_commit_failure_reports_nothing_applied() {
        let harness = Harness::new(
            chain(),
            &["views"],
            MockDatabase::at(v(0, 0, 0, 0)).failing_commit_at(1),
        );

        let err = harness
            .updater(UpdateOptions::new())
            .apply_updates()
            .await
            .unwrap_err();

        assert!(err.is_execution());
        assert_eq!(err.last_applied(), None);
        assert!(err.to_string().contains("1.0.0.3"));
        assert_eq!(harness.database.count(&Call::Script("views".to_string())), 0);
    }

    /// 変更の確定後に常時実行スクリプトが失敗した場合に確定済みバージョンが報告されることを確認
    #[tokio::test]
    async fn test_always_run_failure_after_changes_reports_last_applied() {
        let harness = Harness::new(
            chain(),
            &["views"],
            MockDatabase::at(v(0, 0, 0, 0)).failing_script("views"),
        );

        let err = harness
            .updater(UpdateOptions::new())
            .apply_updates()
            .await
            .unwrap_err();

        assert!(err.is_always_run());
        assert_eq!(err.last_applied(), Some(v(1, 0, 0, 3)));
    }

    /// 常時実行スクリプトの失敗がスクリプト名付きで報告されることを確認
    #[tokio::test]
    async fn test_always_run_failure_is_reported() {
        let harness = Harness::new(
            vec![],
            &["views", "grants"],
            MockDatabase::at(v(0, 0, 0, 0)).failing_script("views"),
        );

        let err = harness
            .updater(UpdateOptions::new())
            .apply_updates()
            .await
            .unwrap_err();

        assert!(err.is_always_run());
        assert!(err.to_string().contains("views"));
        assert_eq!(harness.database.count(&Call::Script("grants".to_string())), 0);
    }

    /// 連鎖が壊れている場合はデータベースに触れずに失敗することを確認
    #[tokio::test]
    async fn test_discovery_failure_touches_nothing() {
        let harness = Harness::new(
            vec![
                change(v(0, 0, 0, 0), v(1, 0, 0, 1)),
                change(v(1, 0, 0, 5), v(1, 0, 0, 6)),
            ],
            &["views"],
            MockDatabase::at(v(0, 0, 0, 0)),
        );

        let err = harness
            .updater(UpdateOptions::new())
            .apply_updates()
            .await
            .unwrap_err();

        assert!(err.is_discovery());
        assert_eq!(harness.database.revision_reads.load(Ordering::SeqCst), 0);
        assert!(harness.database.calls().is_empty());
    }
}
