#[cfg(test)]
mod tests {
    use helm_core::{
        EntityDef, EntityModel, FieldDef, Value,
        schema::{ColumnInfo, SchemaChange, TableInfo, diff},
    };

    fn column(name: &str, type_name: &str, nullable: bool, primary_key: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
            primary_key,
        }
    }

    fn model() -> EntityModel {
        let mut model = EntityModel::new("inventory");
        model.add(
            EntityDef::new("Facility")
                .field(FieldDef::of::<String>("facilityId").primary_key())
                .field(FieldDef::of::<String>("facilityName").not_null())
                .field(FieldDef::new("squareFootage", Value::Decimal(None, 10, 2)))
                .field(FieldDef::of::<i32>("floors").default_value(1)),
        );
        model.add(
            EntityDef::new("Location")
                .field(FieldDef::of::<String>("facilityId").primary_key())
                .field(FieldDef::of::<String>("locationSeqId").primary_key()),
        );
        let view = model
            .view("FacilityLocation")
            .member("F", "Facility")
            .member("L", "Location")
            .link("F", "L", false, [("facilityId", "facilityId")])
            .alias("F", "facilityName", "facilityName")
            .alias("L", "locationSeqId", "locationSeqId")
            .build()
            .unwrap();
        model.add(view);
        model
    }

    fn column_type(field: &FieldDef) -> String {
        field.value.type_name().to_string()
    }

    #[test]
    fn empty_datasource() {
        let model = model();
        let mut messages = Vec::new();
        let changes = diff(model.entities(), &[], column_type, &mut messages);
        assert_eq!(
            messages,
            [
                "Table \"facility\" for entity Facility does not exist",
                "Table \"location\" for entity Location does not exist",
            ],
            "Views have no table"
        );
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| matches!(c, SchemaChange::CreateTable(..))));
        assert_eq!(
            changes[0].to_string(),
            "Created table \"facility\" for entity Facility"
        );
    }

    #[test]
    fn discrepancies() {
        let model = model();
        let tables = [
            TableInfo {
                name: "FACILITY".into(),
                columns: vec![
                    column("facility_id", "varchar", false, true),
                    column("facility_name", "VARCHAR", true, false),
                    column("square_footage", "DOUBLE", true, false),
                    column("legacy_code", "VARCHAR", true, false),
                ],
            },
            TableInfo {
                name: "location".into(),
                columns: vec![
                    column("facility_id", "VARCHAR", false, true),
                    column("location_seq_id", "VARCHAR", false, false),
                ],
            },
        ];
        let mut messages = Vec::new();
        let changes = diff(model.entities(), &tables, column_type, &mut messages);
        assert_eq!(
            messages,
            [
                "Column \"facility_name\" of table \"FACILITY\" is nullable but field Facility.facilityName is declared not null",
                "Column \"square_footage\" of table \"FACILITY\" has type DOUBLE but field Facility.squareFootage expects DECIMAL",
                "Column \"floors\" of table \"FACILITY\" for field Facility.floors does not exist",
                "Column \"legacy_code\" of table \"FACILITY\" is not declared by entity Facility",
                "Column \"location_seq_id\" of table \"location\" is not part of the primary key but field Location.locationSeqId is",
            ]
        );
        assert_eq!(changes.len(), 1, "Only the missing column can be added");
        assert_eq!(
            changes[0].to_string(),
            "Added column \"floors\" to table \"facility\" for field Facility.floors"
        );
        assert_eq!(changes[0].entity().name, "Facility");
    }

    #[test]
    fn matching() {
        let model = model();
        let tables = [
            TableInfo {
                name: "facility".into(),
                columns: vec![
                    column("FACILITY_ID", "VARCHAR", false, true),
                    column("facility_name", "VARCHAR", false, false),
                    column("square_footage", " decimal ", true, false),
                    column("floors", "INTEGER", true, false),
                ],
            },
            TableInfo {
                name: "location".into(),
                columns: vec![
                    column("facility_id", "VARCHAR", false, true),
                    column("location_seq_id", "VARCHAR", false, true),
                ],
            },
            TableInfo {
                name: "unrelated".into(),
                columns: vec![column("id", "INTEGER", false, true)],
            },
        ];
        let mut messages = Vec::new();
        let changes = diff(model.entities(), &tables, column_type, &mut messages);
        assert!(messages.is_empty(), "{:#?}", messages);
        assert!(changes.is_empty());
    }
}
