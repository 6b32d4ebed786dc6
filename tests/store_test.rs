/// Integration tests for the SQLite store
///
/// Each test opens its own in-memory database, so they run in parallel
/// without stepping on each other.
///
/// Run with: cargo test --test store_test

#[cfg(test)]
mod tests {
    use ambassador_hub::database::{
        Database, DatabaseError, NewKpi, NewKpiResult, NewPayment, NewSupportingFile, NewTask,
    };

    async fn store() -> Database {
        Database::new("sqlite::memory:")
            .await
            .expect("in-memory database")
    }

    fn workshop<'a>(title: &'a str, created_by: Option<i64>) -> NewTask<'a> {
        NewTask {
            title,
            description: "Hands-on session",
            task_type: "Workshop",
            location: Some("Accra"),
            date: Some("2025-09-01"),
            budget: 500.0,
            created_by,
        }
    }

    #[tokio::test]
    async fn upsert_user_is_idempotent() {
        let db = store().await;

        let first = db.upsert_user("ada@example.com", "builder").await.unwrap();
        let second = db.upsert_user("ada@example.com", "admin").await.unwrap();

        // Same row, and the original role wins
        assert_eq!(first.id, second.id);
        assert_eq!(second.role, "builder");
    }

    #[tokio::test]
    async fn upsert_profile_overwrites_fields_but_keeps_the_role() {
        let db = store().await;
        db.upsert_user("ops@example.com", "admin").await.unwrap();

        let user = db
            .upsert_profile(
                "ops@example.com",
                Some("Ops"),
                Some("GWALLET"),
                Some("bio"),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(user.role, "admin");
        assert_eq!(user.wallet_address.as_deref(), Some("GWALLET"));

        let user = db
            .upsert_profile("ops@example.com", Some("Ops"), None, None, None, None)
            .await
            .unwrap();
        assert_eq!(user.wallet_address, None);
        assert_eq!(user.bio, None);
    }

    #[tokio::test]
    async fn task_creation_inserts_the_kpis_in_one_transaction() {
        let db = store().await;

        let kpis = [
            NewKpi {
                name: "Attendees",
                target: "50",
                description: None,
            },
            NewKpi {
                name: "Signups",
                target: "20",
                description: Some("Post-event signups"),
            },
        ];
        let task_id = db
            .create_task(&workshop("Intro workshop", None), &kpis)
            .await
            .unwrap();

        let stored = db.list_kpis_for_task(task_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "Attendees");
        assert_eq!(stored[1].description.as_deref(), Some("Post-event signups"));
    }

    #[tokio::test]
    async fn deleting_a_task_cascades_to_its_kpis_and_applications() {
        let db = store().await;
        let builder = db.upsert_user("ada@example.com", "builder").await.unwrap();
        let kpis = [NewKpi {
            name: "Attendees",
            target: "50",
            description: None,
        }];
        let task_id = db
            .create_task(&workshop("Doomed workshop", None), &kpis)
            .await
            .unwrap();
        db.create_application(task_id, builder.id, "Count me in")
            .await
            .unwrap();

        db.delete_task(task_id).await.unwrap();

        assert!(db.list_kpis_for_task(task_id).await.unwrap().is_empty());
        assert!(db.list_applications(Some(builder.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_applications_hit_the_unique_constraint() {
        let db = store().await;
        let builder = db.upsert_user("ada@example.com", "builder").await.unwrap();
        let task_id = db
            .create_task(&workshop("Popular workshop", None), &[])
            .await
            .unwrap();

        db.create_application(task_id, builder.id, "First")
            .await
            .unwrap();
        let second = db.create_application(task_id, builder.id, "Second").await;

        assert!(matches!(second, Err(DatabaseError::Query(_))));
        assert_eq!(db.count_applications(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_task_replaces_the_kpi_set_atomically() {
        let db = store().await;
        let kpis = [NewKpi {
            name: "Old KPI",
            target: "1",
            description: None,
        }];
        let task_id = db
            .create_task(&workshop("Evolving workshop", None), &kpis)
            .await
            .unwrap();

        let replacement = [
            NewKpi {
                name: "New KPI A",
                target: "10",
                description: None,
            },
            NewKpi {
                name: "New KPI B",
                target: "20",
                description: None,
            },
        ];
        db.update_task(
            task_id,
            &workshop("Evolving workshop", None),
            None,
            Some(&replacement),
        )
        .await
        .unwrap();

        let stored = db.list_kpis_for_task(task_id).await.unwrap();
        let names: Vec<&str> = stored.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["New KPI A", "New KPI B"]);
    }

    #[tokio::test]
    async fn updating_a_missing_task_is_not_found() {
        let db = store().await;

        let result = db
            .update_task(999, &workshop("Ghost", None), None, None)
            .await;

        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn submissions_store_results_and_files_together() {
        let db = store().await;
        let builder = db.upsert_user("ada@example.com", "builder").await.unwrap();
        let task_id = db
            .create_task(&workshop("Submitted workshop", None), &[])
            .await
            .unwrap();

        let results = [NewKpiResult {
            name: "Attendees".to_string(),
            target: "50".to_string(),
            achieved: "63".to_string(),
            status: "Pending".to_string(),
        }];
        let files = [NewSupportingFile {
            name: "photos.zip".to_string(),
            size: "4mb".to_string(),
            file_type: "application/zip".to_string(),
            url: "https://files.example.com/photos.zip".to_string(),
        }];
        let submission_id = db
            .create_submission(
                task_id,
                builder.id,
                "Went well",
                "Pending Review",
                &results,
                &files,
            )
            .await
            .unwrap();

        let stored_results = db.list_kpi_results(submission_id).await.unwrap();
        assert_eq!(stored_results.len(), 1);
        assert_eq!(stored_results[0].achieved, "63");

        let stored_files = db.list_supporting_files(submission_id).await.unwrap();
        assert_eq!(stored_files.len(), 1);
        assert_eq!(stored_files[0].file_type, "application/zip");
    }

    #[tokio::test]
    async fn payments_join_their_builder_when_linked() {
        let db = store().await;
        let builder = db.upsert_user("ada@example.com", "builder").await.unwrap();

        db.create_payment(&NewPayment {
            stream_id: None,
            amount: 120.0,
            token: Some("XLM"),
            from_address: None,
            to_address: Some("GWALLET"),
            tx_hash: Some("abc"),
            builder_id: Some(builder.id),
        })
        .await
        .unwrap();
        db.create_payment(&NewPayment {
            stream_id: Some("stream-1"),
            amount: 80.0,
            token: None,
            from_address: None,
            to_address: None,
            tx_hash: None,
            builder_id: None,
        })
        .await
        .unwrap();

        let payments = db.list_payments().await.unwrap();
        assert_eq!(payments.len(), 2);

        let linked = payments
            .iter()
            .find(|p| p.builder_id.is_some())
            .unwrap();
        assert_eq!(linked.builder_email.as_deref(), Some("ada@example.com"));

        let unlinked = payments
            .iter()
            .find(|p| p.builder_id.is_none())
            .unwrap();
        assert_eq!(unlinked.builder_email, None);
        assert_eq!(unlinked.stream_id.as_deref(), Some("stream-1"));
    }

    #[tokio::test]
    async fn analytics_counters_track_seeded_rows() {
        let db = store().await;
        let ada = db.upsert_user("ada@example.com", "builder").await.unwrap();
        let bob = db.upsert_user("bob@example.com", "builder").await.unwrap();
        db.upsert_user("ops@example.com", "admin").await.unwrap();

        let task_a = db
            .create_task(&workshop("Workshop A", None), &[])
            .await
            .unwrap();
        let task_b = db
            .create_task(&workshop("Workshop B", None), &[])
            .await
            .unwrap();

        db.create_application(task_a, ada.id, "A").await.unwrap();
        db.create_application(task_b, ada.id, "B").await.unwrap();
        db.create_application(task_a, bob.id, "C").await.unwrap();

        db.create_submission(task_a, ada.id, "Done", "Approved", &[], &[])
            .await
            .unwrap();

        assert_eq!(db.count_users_with_role("builder").await.unwrap(), 2);
        assert_eq!(db.count_tasks(Some("Open")).await.unwrap(), 2);
        assert_eq!(db.count_applications(Some("Pending")).await.unwrap(), 3);
        assert_eq!(db.count_submissions(Some("Approved")).await.unwrap(), 1);
        assert_eq!(db.sum_task_budgets().await.unwrap(), 1000.0);

        let top = db.top_builders(5).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].email, "ada@example.com");
        assert_eq!(top[0].total_submissions, 1);
        assert_eq!(top[0].approved_submissions, 1);
        assert_eq!(top[0].total_applications, 2);

        let recent = db.recent_applications(2).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn task_status_updates_keep_the_stream_id() {
        let db = store().await;
        let task_id = db
            .create_task(&workshop("Funded workshop", None), &[])
            .await
            .unwrap();

        db.update_task_status(task_id, "In Progress", Some("stream-42"))
            .await
            .unwrap();
        db.update_task_status(task_id, "Pending Stream Start", None)
            .await
            .unwrap();

        let task = db.get_task(task_id).await.unwrap();
        assert_eq!(task.status, "Pending Stream Start");
        assert_eq!(task.stream_id.as_deref(), Some("stream-42"));
    }
}
