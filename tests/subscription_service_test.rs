use std::sync::Arc;

use fizzboxd::repository::table::Table;
use fizzboxd::service::error::ServiceError;
use fizzboxd::service::subscription_service::SubscriptionService;

mod common;

// Handles setup, execution, and teardown automatically.
macro_rules! service_test {
    ($name:ident, |$repo:ident, $service:ident| $body:block) => {
        #[tokio::test]
        async fn $name() {
            let ($repo, db_path) = common::setup_db().await;
            let $service = SubscriptionService::new($repo.clone());

            $body

            common::teardown_db($repo, db_path).await;
        }
    };
}

service_test!(test_subscribe_registers_everything, |repo, service| {
    service.subscribe("Fizz", "100", "1").await.unwrap();

    assert!(service.exists("fizz", "100").await.unwrap());
    assert!(service.exists("FIZZ", "100").await.unwrap());
    assert_eq!(repo.subscriber.count().await.unwrap(), 1);
    assert_eq!(repo.destination.count().await.unwrap(), 1);
    assert_eq!(repo.destination_group.count().await.unwrap(), 1);

    let stored = repo.subscriber.select_by_name("fizz").await.unwrap();
    assert_eq!(stored.unwrap().name, "fizz");
});

service_test!(test_duplicate_subscribe_conflicts, |repo, service| {
    service.subscribe("fizz", "100", "1").await.unwrap();

    let err = service.subscribe("Fizz", "100", "1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { .. }));

    assert_eq!(repo.subscription.count().await.unwrap(), 1);
    assert_eq!(repo.subscriber.count().await.unwrap(), 1);
    assert_eq!(repo.destination.count().await.unwrap(), 1);
});

service_test!(test_concurrent_subscribe_yields_one_row, |repo, service| {
    let service = Arc::new(service);
    let a = service.clone();
    let b = service.clone();

    let (ra, rb) = tokio::join!(
        async move { a.subscribe("fizz", "100", "1").await },
        async move { b.subscribe("fizz", "100", "1").await },
    );

    assert_eq!(
        [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    assert_eq!(repo.subscription.count().await.unwrap(), 1);
});

service_test!(test_unsubscribe_cascades_orphans, |repo, service| {
    service.subscribe("fizz", "100", "1").await.unwrap();

    let removed = service.unsubscribe("Fizz", "100").await.unwrap();
    assert_eq!(removed, 1);

    assert!(!service.exists("fizz", "100").await.unwrap());
    assert_eq!(repo.subscription.count().await.unwrap(), 0);
    assert_eq!(repo.subscriber.count().await.unwrap(), 0);
    assert_eq!(repo.destination.count().await.unwrap(), 0);
    assert_eq!(repo.destination_group.count().await.unwrap(), 0);
});

service_test!(test_unsubscribe_keeps_shared_rows, |repo, service| {
    service.subscribe("fizz", "100", "1").await.unwrap();
    service.subscribe("buzz", "100", "1").await.unwrap();
    service.subscribe("fizz", "200", "1").await.unwrap();

    service.unsubscribe("fizz", "100").await.unwrap();

    // Destination 100 is still used by buzz, fizz still follows in 200.
    assert_eq!(repo.subscriber.count().await.unwrap(), 2);
    assert_eq!(repo.destination.count().await.unwrap(), 2);
    assert_eq!(repo.destination_group.count().await.unwrap(), 1);

    service.unsubscribe("fizz", "200").await.unwrap();
    assert_eq!(repo.subscriber.count().await.unwrap(), 1);
    assert_eq!(repo.destination.count().await.unwrap(), 1);
    assert_eq!(repo.destination_group.count().await.unwrap(), 1);

    service.unsubscribe("buzz", "100").await.unwrap();
    assert_eq!(repo.destination_group.count().await.unwrap(), 0);
});

service_test!(test_unsubscribe_missing_pair, |repo, service| {
    service.subscribe("fizz", "100", "1").await.unwrap();

    assert_eq!(service.unsubscribe("buzz", "100").await.unwrap(), 0);
    assert_eq!(service.unsubscribe("fizz", "999").await.unwrap(), 0);

    let err = service.unsubscribe_strict("buzz", "100").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));

    assert_eq!(repo.subscription.count().await.unwrap(), 1);
});

service_test!(test_list_subscribers_is_sorted, |repo, service| {
    for name in ["zed", "amy", "Mia"] {
        service.subscribe(name, "100", "1").await.unwrap();
    }
    service.subscribe("bob", "200", "1").await.unwrap();

    assert_eq!(
        service.list_subscribers("100").await.unwrap(),
        vec!["amy", "mia", "zed"]
    );
    assert!(service.list_subscribers("300").await.unwrap().is_empty());
    assert_eq!(repo.subscriber.count().await.unwrap(), 4);
});

service_test!(test_grouped_subscriptions_and_history, |repo, service| {
    service.subscribe("fizz", "100", "1").await.unwrap();
    service.subscribe("fizz", "200", "2").await.unwrap();
    service.subscribe("buzz", "100", "1").await.unwrap();

    let history = vec!["e2".to_string(), "e1".to_string()];
    service
        .update_history("fizz", "200", history.clone())
        .await
        .unwrap();

    let grouped = service.list_all_subscriptions_by_subscriber().await.unwrap();
    assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["buzz", "fizz"]);

    let fizz = &grouped["fizz"];
    assert_eq!(fizz.len(), 2);
    assert_eq!(fizz[0].destination, "100");
    assert!(fizz[0].history.is_empty());
    assert_eq!(fizz[1].destination, "200");
    assert_eq!(fizz[1].history, history);

    assert_eq!(repo.subscription.count().await.unwrap(), 3);
});

service_test!(test_update_history_replaces_and_requires_pair, |repo, service| {
    service.subscribe("fizz", "100", "1").await.unwrap();

    service
        .update_history("fizz", "100", vec!["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    service
        .update_history("fizz", "100", vec!["c".to_string()])
        .await
        .unwrap();

    let grouped = service.list_all_subscriptions_by_subscriber().await.unwrap();
    assert_eq!(grouped["fizz"][0].history, vec!["c".to_string()]);

    let err = service
        .update_history("buzz", "100", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert_eq!(repo.subscription.count().await.unwrap(), 1);
});
