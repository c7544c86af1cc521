//! Builder round trips against a running server.

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use dynaquery_core::{ComparisonOperator, DynamoDBErrorCode, Order, ReadMode, ReadOperation};
    use dynaquery_model::AttributeValue;

    use crate::{create_notes_table, delete_table, dynamo, sdk_client, test_table_name};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        resource_id: String,
        created_at: i64,
        id: String,
        note: String,
        written_by: String,
    }

    fn note(created_at: i64, author: &str) -> Note {
        Note {
            resource_id: "myResourceTest".to_owned(),
            created_at,
            id: format!("note-{created_at}"),
            note: format!("note {created_at}"),
            written_by: author.to_owned(),
        }
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_save_and_query_in_order() {
        let client = sdk_client();
        let table_name = test_table_name("order");
        create_notes_table(&client, &table_name);
        let dynamo = dynamo(&client);

        for (created_at, author) in [(2, "ana"), (1, "bo"), (3, "ana")] {
            dynamo
                .save(&table_name)
                .entity(&note(created_at, author))
                .execute()
                .unwrap();
        }

        let page = dynamo
            .query(&table_name, ReadMode::Table)
            .criterion("resource_id", ComparisonOperator::Equal, "myResourceTest")
            .order(Order::Ascending)
            .execute()
            .unwrap();
        let notes: Vec<Note> = page.deserialize_items().unwrap();
        assert_eq!(
            notes.iter().map(|n| n.created_at).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let page = dynamo
            .query(&table_name, ReadMode::Table)
            .criterion("resource_id", ComparisonOperator::Equal, "myResourceTest")
            .criterion("created_at", ComparisonOperator::GreaterThan, 1)
            .order(Order::Descending)
            .execute()
            .unwrap();
        let notes: Vec<Note> = page.deserialize_items().unwrap();
        assert_eq!(
            notes.iter().map(|n| n.created_at).collect::<Vec<_>>(),
            vec![3, 2]
        );

        delete_table(&client, &table_name);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_page_with_limit() {
        let client = sdk_client();
        let table_name = test_table_name("page");
        create_notes_table(&client, &table_name);
        let dynamo = dynamo(&client);

        for created_at in 1..=5 {
            dynamo
                .save(&table_name)
                .entity(&note(created_at, "ana"))
                .execute()
                .unwrap();
        }

        let first = dynamo
            .query(&table_name, ReadMode::Table)
            .criterion("resource_id", ComparisonOperator::Equal, "myResourceTest")
            .limit(Some(2))
            .execute()
            .unwrap();
        assert_eq!(first.items.len(), 2);
        let cursor = first.last_evaluated_key.clone().unwrap();

        let rest = dynamo
            .query(&table_name, ReadMode::Table)
            .criterion("resource_id", ComparisonOperator::Equal, "myResourceTest")
            .resume_from(cursor)
            .execute()
            .unwrap();
        let notes: Vec<Note> = rest.deserialize_items().unwrap();
        assert_eq!(
            notes.iter().map(|n| n.created_at).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );

        delete_table(&client, &table_name);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_query_index_and_scan_with_filter() {
        let client = sdk_client();
        let table_name = test_table_name("index");
        create_notes_table(&client, &table_name);
        let dynamo = dynamo(&client);

        for (created_at, author) in [(1, "ana"), (2, "bo"), (3, "ana")] {
            dynamo
                .save(&table_name)
                .entity(&note(created_at, author))
                .execute()
                .unwrap();
        }

        let page = dynamo
            .query(&table_name, ReadMode::Index("by_author".to_owned()))
            .criterion("written_by", ComparisonOperator::Equal, "ana")
            .execute()
            .unwrap();
        assert_eq!(page.items.len(), 2);

        let page = dynamo
            .query(&table_name, ReadMode::Scan)
            .criterion("written_by", ComparisonOperator::Equal, "bo")
            .execute()
            .unwrap();
        let notes: Vec<Note> = page.deserialize_items().unwrap();
        assert_eq!(notes, vec![note(2, "bo")]);

        delete_table(&client, &table_name);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_update_and_remove() {
        let client = sdk_client();
        let table_name = test_table_name("update");
        create_notes_table(&client, &table_name);
        let dynamo = dynamo(&client);

        dynamo
            .save(&table_name)
            .entity(&note(1, "ana"))
            .execute()
            .unwrap();

        let updated = dynamo
            .update(&table_name)
            .criterion("resource_id", "myResourceTest")
            .criterion("created_at", 1)
            .value("note", "edited")
            .number_value("revision", 2)
            .execute()
            .unwrap();
        assert_eq!(
            updated.get("note"),
            Some(&AttributeValue::S("edited".to_owned()))
        );

        dynamo
            .remove(&table_name)
            .criterion("resource_id", "myResourceTest")
            .criterion("created_at", 1)
            .execute()
            .unwrap();

        let page = dynamo
            .query(&table_name, ReadMode::Table)
            .criterion("resource_id", ComparisonOperator::Equal, "myResourceTest")
            .execute()
            .unwrap();
        assert!(page.items.is_empty());

        delete_table(&client, &table_name);
    }

    #[test]
    #[ignore = "requires running server"]
    fn test_should_pass_through_service_errors() {
        let client = sdk_client();
        let dynamo = dynamo(&client);

        let err = dynamo
            .query(test_table_name("missing"), ReadMode::Table)
            .criterion("resource_id", ComparisonOperator::Equal, "myResourceTest")
            .execute()
            .unwrap_err();
        assert_eq!(
            err.as_client().map(|e| e.code),
            Some(DynamoDBErrorCode::ResourceNotFoundException)
        );
    }
}
