#[cfg(test)]
mod tests {
    use helm_core::{
        EntityDef, EntityListIterator, EntityValue, Error, FieldDef, Result,
        stream::{self, StreamExt},
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn numbers(count: i64) -> (Arc<EntityDef>, Vec<EntityValue>) {
        let entity = Arc::new(
            EntityDef::new("Number").field(FieldDef::of::<i64>("value").primary_key()),
        );
        let values = (1..=count)
            .map(|v| EntityValue::with(&entity, [("value", v)]).unwrap())
            .collect();
        (entity, values)
    }

    fn cursor(count: i64, released: &Arc<AtomicUsize>) -> EntityListIterator {
        let (entity, values) = numbers(count);
        let released = released.clone();
        EntityListIterator::from_values(entity, values).on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn value_of(value: &EntityValue) -> i64 {
        value.get_as::<i64>("value").unwrap().unwrap()
    }

    #[tokio::test]
    async fn iterate() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut cursor = cursor(3, &released);
        assert_eq!(cursor.entity().name, "Number");
        let mut seen = Vec::new();
        while let Some(value) = cursor.next().await.unwrap() {
            seen.push(value_of(&value));
        }
        assert_eq!(seen, [1, 2, 3]);
        assert!(cursor.next().await.unwrap().is_none());
        assert!(cursor.next().await.unwrap().is_none());
        assert_eq!(cursor.fetched(), 3);
        assert!(!cursor.is_closed());
        assert_eq!(released.load(Ordering::SeqCst), 0);
        cursor.close().await.unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut cursor = cursor(10, &released);
        let page = cursor.partial_list(2, 3).await.unwrap();
        assert_eq!(page.iter().map(value_of).collect::<Vec<_>>(), [3, 4, 5]);
        assert_eq!(cursor.fetched(), 5);
        let rest = cursor.complete_list().await.unwrap();
        assert_eq!(rest.len(), 5);
        assert!(cursor.partial_list(0, 3).await.unwrap().is_empty());
        let mut cursor = self::cursor(4, &released);
        assert!(cursor.partial_list(10, 3).await.unwrap().is_empty());
        assert!(cursor.partial_list(0, 3).await.unwrap().is_empty());
        cursor.close().await.unwrap();
    }

    #[tokio::test]
    async fn dropped() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let mut cursor = cursor(3, &released);
            cursor.next().await.unwrap();
        }
        assert_eq!(
            released.load(Ordering::SeqCst),
            1,
            "Dropping an open cursor still releases it"
        );
    }

    #[tokio::test]
    async fn scoped() {
        let released = Arc::new(AtomicUsize::new(0));
        let total = cursor(4, &released)
            .scoped(async |cursor| {
                let mut total = 0;
                while let Some(value) = cursor.next().await? {
                    total += value_of(&value);
                }
                Ok(total)
            })
            .await
            .unwrap();
        assert_eq!(total, 10);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        let result: Result<()> = cursor(4, &released)
            .scoped(async |cursor| {
                cursor.next().await?;
                Err(Error::invalid_query("stop"))
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidQuery(..))));
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_stream() {
        let (entity, mut values) = numbers(1);
        let first = values.remove(0);
        let rows = stream::iter([Ok(first), Err(Error::msg("connection reset"))]).boxed();
        let mut cursor = EntityListIterator::new(entity, rows);
        assert!(cursor.next().await.unwrap().is_some());
        let error = cursor.next().await.expect_err("The stream failure is reported");
        assert!(error.is_retryable());
        assert_eq!(cursor.fetched(), 1);
        cursor.close().await.unwrap();
    }
}
