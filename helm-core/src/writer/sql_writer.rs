use crate::{
    Aggregate, ComparisonOp, Condition, EntityDef, EntityQuery, EntityValue, FieldDef,
    FieldSource, JoinOp, Nulls, Operand, Order, OrderBy, PrimaryKey, RelationDef, Value,
    possibly_parenthesized, separated_by,
    writer::{Context, Fragment},
};
use std::{collections::BTreeMap, fmt::Write};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $context:ident, $out:ident, $value:expr) => {{
        if $value.is_infinite() {
            $this.write_value_infinity($context, $out, $value.is_sign_negative());
        } else if $value.is_nan() {
            $this.write_value_nan($context, $out);
        } else {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        }
    }};
}

/// Dialect printer turning entity operations into SQL text.
///
/// Every `write_*` statement method appends one statement terminated by `;` to
/// `out`. Literals are rendered inline, escaped by the dialect.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Whether the current fragment context allows alias declaration.
    fn alias_declaration(&self, context: &mut Context) -> bool {
        matches!(
            context.fragment,
            Fragment::SqlSelectFrom | Fragment::SqlJoin
        )
    }

    /// Whether view fields render as their aggregate expression in this fragment.
    fn aggregate_fields(&self, context: &mut Context) -> bool {
        matches!(
            context.fragment,
            Fragment::SqlSelect | Fragment::SqlSelectHaving | Fragment::SqlSelectOrderBy
        )
    }

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Render the entity table, declaring `alias` where the fragment allows it.
    fn write_table_ref(
        &self,
        context: &mut Context,
        out: &mut String,
        entity: &EntityDef,
        alias: &str,
    ) {
        self.write_identifier_quoted(context, out, &entity.table);
        if !alias.is_empty() && self.alias_declaration(context) {
            out.push(' ');
            self.write_identifier_quoted(context, out, alias);
        }
    }

    /// Render a column, qualified by `qualifier` when the context asks for it.
    fn write_column_ref(
        &self,
        context: &mut Context,
        out: &mut String,
        qualifier: &str,
        column: &str,
    ) {
        if context.qualify_columns && !qualifier.is_empty() {
            self.write_identifier_quoted(context, out, qualifier);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, column);
    }

    /// Render a field of the queried entity: a column, a view member column or an aggregate.
    fn write_field(
        &self,
        context: &mut Context,
        out: &mut String,
        query: &EntityQuery,
        name: &str,
    ) {
        match query.source(name) {
            Some(FieldSource::Column(field)) => {
                self.write_column_ref(context, out, &query.entity.table, &field.column_name)
            }
            Some(FieldSource::Member {
                alias,
                field,
                function,
            }) => match function {
                Some(function) if self.aggregate_fields(context) => {
                    self.write_aggregate(context, out, function, alias, &field.column_name)
                }
                _ => self.write_column_ref(context, out, alias, &field.column_name),
            },
            None => log::error!(
                "Field `{}` cannot be resolved on entity {}",
                name,
                query.entity.name
            ),
        }
    }

    /// Render an aggregate call over a member column.
    fn write_aggregate(
        &self,
        context: &mut Context,
        out: &mut String,
        function: Aggregate,
        qualifier: &str,
        column: &str,
    ) {
        let _ = write!(out, "{}(", function);
        if function == Aggregate::CountDistinct {
            out.push_str("DISTINCT ");
        }
        self.write_column_ref(context, out, qualifier, column);
        out.push(')');
    }

    /// Render the SQL type for a `Value` prototype.
    fn write_column_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float64(..) => out.push_str("DOUBLE"),
            Value::Decimal(.., precision, scale) => {
                out.push_str("DECIMAL");
                if (precision, scale) != (&0, &0) {
                    let _ = write!(out, "({},{})", precision, scale);
                }
            }
            Value::Varchar(..) => out.push_str("VARCHAR"),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::Uuid(..) => out.push_str("UUID"),
            Value::Null => log::error!("Value::Null does not describe a column type"),
        };
    }

    /// Render a concrete value (including proper quoting / escaping).
    fn write_value(&self, context: &mut Context, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(context, out),
            Value::Boolean(Some(v)) => self.write_value_bool(context, out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::Float64(Some(v)) => write_float!(self, context, out, *v),
            Value::Decimal(Some(v), ..) => drop(write!(out, "{}", v)),
            Value::Varchar(Some(v)) => self.write_value_string(context, out, v),
            Value::Blob(Some(v)) => self.write_value_blob(context, out, v.as_ref()),
            Value::Date(Some(v)) => self.write_value_date(context, out, v, false),
            Value::Time(Some(v)) => self.write_value_time(context, out, v, false),
            Value::Timestamp(Some(v)) => self.write_value_timestamp(context, out, v),
            Value::Uuid(Some(v)) => self.write_value_uuid(context, out, v),
            _ => log::error!("Cannot write {:?}", value),
        };
    }

    /// Render NULL literal.
    fn write_value_none(&self, _context: &mut Context, out: &mut String) {
        out.push_str("NULL");
    }

    /// Render boolean literal.
    fn write_value_bool(&self, _context: &mut Context, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    /// Render +/- INF.
    fn write_value_infinity(&self, _context: &mut Context, out: &mut String, negative: bool) {
        out.push_str(if negative {
            "CAST('-Infinity' AS DOUBLE)"
        } else {
            "CAST('Infinity' AS DOUBLE)"
        });
    }

    /// Render NaN.
    fn write_value_nan(&self, _context: &mut Context, out: &mut String) {
        out.push_str("CAST('NaN' AS DOUBLE)");
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(context, out, value, '\'', "''");
        out.push('\'');
    }

    /// Render a blob literal using hex escapes.
    fn write_value_blob(&self, _context: &mut Context, out: &mut String, value: &[u8]) {
        out.push('\'');
        for b in value {
            let _ = write!(out, "\\x{:02X}", b);
        }
        out.push('\'');
    }

    /// Render a DATE literal (optionally as part of TIMESTAMP composition).
    fn write_value_date(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &Date,
        timestamp: bool,
    ) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:04}-{:02}-{:02}{b}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    /// Render a TIME literal with microsecond precision (optionally as part of TIMESTAMP composition).
    fn write_value_time(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &Time,
        timestamp: bool,
    ) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:02}:{:02}:{:02}.{:06}{b}",
            value.hour(),
            value.minute(),
            value.second(),
            value.microsecond()
        );
    }

    /// Render a TIMESTAMP literal.
    fn write_value_timestamp(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &PrimitiveDateTime,
    ) {
        out.push('\'');
        self.write_value_date(context, out, &value.date(), true);
        out.push(' ');
        self.write_value_time(context, out, &value.time(), true);
        out.push('\'');
    }

    fn write_value_uuid(&self, _context: &mut Context, out: &mut String, value: &Uuid) {
        let _ = write!(out, "'{}'", value);
    }

    /// Render a condition tree against the fields of `query`.
    fn write_condition(
        &self,
        context: &mut Context,
        out: &mut String,
        query: &EntityQuery,
        condition: &Condition,
    ) {
        match condition {
            Condition::All => self.write_value_bool(context, out, true),
            Condition::Compare { field, op, operand } => {
                self.write_comparison(context, out, query, field, *op, operand)
            }
            Condition::IsNull(field) => {
                self.write_field(context, out, query, field);
                out.push_str(" IS NULL");
            }
            Condition::IsNotNull(field) => {
                self.write_field(context, out, query, field);
                out.push_str(" IS NOT NULL");
            }
            Condition::Join { op, conditions } => {
                if conditions.is_empty() {
                    self.write_value_bool(context, out, *op == JoinOp::And);
                    return;
                }
                separated_by(
                    out,
                    conditions,
                    |out, v| {
                        possibly_parenthesized!(
                            out,
                            matches!(v, Condition::Join { conditions, .. } if conditions.len() > 1),
                            self.write_condition(context, out, query, v)
                        );
                    },
                    match op {
                        JoinOp::And => " AND ",
                        JoinOp::Or => " OR ",
                    },
                );
            }
            Condition::Not(v) => {
                out.push_str("NOT (");
                self.write_condition(context, out, query, v);
                out.push(')');
            }
        }
    }

    /// Render `field op operand`. Literals are converted to the field type first.
    fn write_comparison(
        &self,
        context: &mut Context,
        out: &mut String,
        query: &EntityQuery,
        field: &str,
        op: ComparisonOp,
        operand: &Operand,
    ) {
        let prototype = query
            .entity
            .get_field(field)
            .map(|f| f.value.clone())
            .unwrap_or_default();
        let literal = |v: &Value| v.coerce_to(&prototype).unwrap_or_else(|| v.clone());
        match (op, operand) {
            (ComparisonOp::Equal | ComparisonOp::NotEqual, Operand::Value(v)) if v.is_null() => {
                self.write_field(context, out, query, field);
                out.push_str(if op == ComparisonOp::Equal {
                    " IS NULL"
                } else {
                    " IS NOT NULL"
                });
            }
            (ComparisonOp::In | ComparisonOp::NotIn, Operand::List(values)) => {
                if values.is_empty() {
                    self.write_value_bool(context, out, op == ComparisonOp::NotIn);
                    return;
                }
                self.write_field(context, out, query, field);
                let _ = write!(out, " {} (", op);
                separated_by(
                    out,
                    values,
                    |out, v| self.write_value(context, out, &literal(v)),
                    ", ",
                );
                out.push(')');
            }
            (ComparisonOp::Between | ComparisonOp::NotBetween, Operand::List(values))
                if values.len() == 2 =>
            {
                self.write_field(context, out, query, field);
                let _ = write!(out, " {} ", op);
                self.write_value(context, out, &literal(&values[0]));
                out.push_str(" AND ");
                self.write_value(context, out, &literal(&values[1]));
            }
            (ComparisonOp::Like | ComparisonOp::NotLike, Operand::Value(v)) => {
                self.write_field(context, out, query, field);
                let _ = write!(out, " {} ", op);
                self.write_value(context, out, v);
            }
            (_, Operand::Value(v)) => {
                self.write_field(context, out, query, field);
                let _ = write!(out, " {} ", op);
                self.write_value(context, out, &literal(v));
            }
            (_, Operand::Field(other)) => {
                self.write_field(context, out, query, field);
                let _ = write!(out, " {} ", op);
                self.write_field(context, out, query, other);
            }
            (_, Operand::List(..)) => log::error!(
                "Operator {} does not take a list operand (field `{}`)",
                op,
                field
            ),
        }
    }

    /// Render `"col" = value AND ...` for the populated key fields of `key`.
    fn write_key_condition(
        &self,
        context: &mut Context,
        out: &mut String,
        entity: &EntityDef,
        key: &EntityValue,
    ) {
        separated_by(
            out,
            entity.primary_key_fields(),
            |out, field| {
                self.write_column_ref(context, out, &entity.table, &field.column_name);
                out.push_str(" = ");
                self.write_value(
                    context,
                    out,
                    key.get(field.name()).unwrap_or(&Value::Null),
                );
            },
            " AND ",
        );
    }

    /// Render one ORDER BY entry.
    fn write_order_by(
        &self,
        context: &mut Context,
        out: &mut String,
        query: &EntityQuery,
        order: &OrderBy,
    ) {
        self.write_field(context, out, query, &order.field);
        self.write_order_suffix(context, out, order);
    }

    fn write_order_suffix(&self, _context: &mut Context, out: &mut String, order: &OrderBy) {
        match order.order {
            Order::Default => {}
            Order::ASC => out.push_str(" ASC"),
            Order::DESC => out.push_str(" DESC"),
        }
        match order.nulls {
            Some(Nulls::First) => out.push_str(" NULLS FIRST"),
            Some(Nulls::Last) => out.push_str(" NULLS LAST"),
            None => {}
        }
    }

    /// Render LIMIT / OFFSET.
    fn write_limit_offset(
        &self,
        _context: &mut Context,
        out: &mut String,
        limit: Option<u32>,
        offset: Option<u32>,
    ) {
        if let Some(limit) = limit {
            out.push_str("\nLIMIT ");
            write_integer!(out, limit);
        }
        if let Some(offset) = offset {
            out.push_str("\nOFFSET ");
            write_integer!(out, offset);
        }
    }

    /// Render the row lock clause.
    fn write_for_update(&self, _context: &mut Context, out: &mut String) {
        out.push_str("\nFOR UPDATE");
    }

    /// Render the join keyword for a view link.
    fn write_join_type(&self, _context: &mut Context, out: &mut String, optional: bool) {
        out.push_str(if optional { "LEFT JOIN" } else { "INNER JOIN" });
    }

    /// Render the FROM target: the table, or the joined members of a view.
    fn write_from(&self, context: &mut Context, out: &mut String, query: &EntityQuery) {
        let Some(view) = &query.entity.view else {
            self.write_table_ref(context, out, query.entity, "");
            return;
        };
        let Some(first) = query.members.first() else {
            log::error!("View {} has no members", query.entity.name);
            return;
        };
        self.write_table_ref(context, out, &first.entity, &first.alias);
        let mut joined = vec![first.alias.as_str()];
        let mut context = context.switch_fragment(Fragment::SqlJoin);
        context.qualify_columns = true;
        for link in &view.links {
            let (Some(lhs), Some(rhs)) = (query.member(&link.alias), query.member(&link.rel_alias))
            else {
                continue;
            };
            out.push('\n');
            self.write_join_type(&mut context, out, link.optional);
            out.push(' ');
            self.write_table_ref(&mut context, out, rhs, &link.rel_alias);
            out.push_str(" ON ");
            separated_by(
                out,
                &link.key_maps,
                |out, key| {
                    self.write_column_ref(
                        &mut context,
                        out,
                        &link.alias,
                        &column_of(lhs, &key.field),
                    );
                    out.push_str(" = ");
                    self.write_column_ref(
                        &mut context,
                        out,
                        &link.rel_alias,
                        &column_of(rhs, &key.rel_field),
                    );
                },
                " AND ",
            );
            joined.push(link.rel_alias.as_ref());
        }
        for member in query.members.iter().filter(|m| !joined.contains(&m.alias.as_str())) {
            out.push_str("\nCROSS JOIN ");
            self.write_table_ref(&mut context, out, &member.entity, &member.alias);
        }
    }

    /// Emit CREATE TABLE with columns and key.
    fn write_create_table(&self, out: &mut String, entity: &EntityDef) {
        let mut context = Context::new(Fragment::SqlCreateTable, false);
        out.reserve(128 + entity.fields.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE TABLE ");
        self.write_table_ref(&mut context, out, entity, "");
        out.push_str(" (\n");
        let composite = entity.primary_key_len() > 1;
        separated_by(
            out,
            &entity.fields,
            |out, field| {
                self.write_create_table_column_fragment(&mut context, out, field);
                if field.primary_key && !composite {
                    out.push_str(" PRIMARY KEY");
                }
            },
            ",\n",
        );
        if composite {
            out.push_str(",\nPRIMARY KEY (");
            let mut context = context.switch_fragment(Fragment::SqlCreateTablePrimaryKey);
            separated_by(
                out,
                entity.primary_key_fields(),
                |out, field| self.write_identifier_quoted(&mut context, out, &field.column_name),
                ", ",
            );
            out.push(')');
        }
        out.push_str(");");
    }

    /// Emit single column definition fragment.
    fn write_create_table_column_fragment(
        &self,
        context: &mut Context,
        out: &mut String,
        field: &FieldDef,
    ) {
        self.write_identifier_quoted(context, out, &field.column_name);
        out.push(' ');
        self.write_column_type(context, out, &field.value);
        if !field.nullable {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &field.default {
            out.push_str(" DEFAULT ");
            self.write_value(context, out, default);
        }
    }

    /// Emit ALTER TABLE ADD COLUMN, not null only when a default fills the existing rows.
    fn write_add_column(&self, out: &mut String, entity: &EntityDef, field: &FieldDef) {
        let mut context = Context::new(Fragment::SqlAlterTable, false);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("ALTER TABLE ");
        self.write_table_ref(&mut context, out, entity, "");
        out.push_str(" ADD COLUMN ");
        self.write_identifier_quoted(&mut context, out, &field.column_name);
        out.push(' ');
        self.write_column_type(&mut context, out, &field.value);
        if let Some(default) = &field.default {
            if !field.nullable {
                out.push_str(" NOT NULL");
            }
            out.push_str(" DEFAULT ");
            self.write_value(&mut context, out, default);
        }
        out.push(';');
    }

    /// Emit INSERT of the populated fields of `value`.
    fn write_insert(&self, out: &mut String, value: &EntityValue) {
        let entity = value.entity();
        let mut context = Context::new(Fragment::SqlInsertInto, false);
        out.reserve(128 + value.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("INSERT INTO ");
        self.write_table_ref(&mut context, out, entity, "");
        let fields = entity
            .fields
            .iter()
            .filter_map(|f| value.get(f.name()).map(|v| (f, v)))
            .collect::<Vec<_>>();
        if fields.is_empty() {
            out.push_str(" DEFAULT VALUES;");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            &fields,
            |out, (f, _)| self.write_identifier_quoted(&mut context, out, &f.column_name),
            ", ",
        );
        out.push_str(") VALUES\n(");
        let mut context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        separated_by(
            out,
            &fields,
            |out, (_, v)| self.write_value(&mut context, out, v),
            ", ",
        );
        out.push_str(");");
    }

    /// Emit SELECT of the query, terminated.
    fn write_select(&self, out: &mut String, query: &EntityQuery) {
        let mut context = Context::new(Fragment::SqlSelect, query.entity.is_view());
        if !out.is_empty() {
            out.push('\n');
        }
        self.write_select_body(&mut context, out, query);
        if query.options.for_update {
            self.write_for_update(&mut context, out);
        }
        out.push(';');
    }

    /// SELECT without terminator, reused by the counting sub-select.
    fn write_select_body(&self, context: &mut Context, out: &mut String, query: &EntityQuery) {
        out.reserve(128 + query.fields.len() * 32);
        out.push_str("SELECT ");
        if query.options.distinct {
            out.push_str("DISTINCT ");
        }
        let view = query.entity.is_view();
        let mut select = context.switch_fragment(Fragment::SqlSelect);
        separated_by(
            out,
            &query.fields,
            |out, field| {
                self.write_field(&mut select, out, query, &field.name);
                if view {
                    out.push_str(" AS ");
                    self.write_identifier_quoted(&mut select, out, &field.name);
                }
            },
            ", ",
        );
        out.push_str("\nFROM ");
        self.write_from(&mut context.switch_fragment(Fragment::SqlSelectFrom), out, query);
        if let Some(condition) = query.where_condition
            && *condition != Condition::All
        {
            out.push_str("\nWHERE ");
            self.write_condition(
                &mut context.switch_fragment(Fragment::SqlSelectWhere),
                out,
                query,
                condition,
            );
        }
        if !query.group_by.is_empty() {
            out.push_str("\nGROUP BY ");
            let mut context = context.switch_fragment(Fragment::SqlSelectGroupBy);
            separated_by(
                out,
                &query.group_by,
                |out, field| self.write_field(&mut context, out, query, &field.name),
                ", ",
            );
        }
        if let Some(condition) = query.having_condition
            && *condition != Condition::All
        {
            out.push_str("\nHAVING ");
            self.write_condition(
                &mut context.switch_fragment(Fragment::SqlSelectHaving),
                out,
                query,
                condition,
            );
        }
        if !query.order_by.is_empty() {
            out.push_str("\nORDER BY ");
            let mut context = context.switch_fragment(Fragment::SqlSelectOrderBy);
            separated_by(
                out,
                query.order_by,
                |out, order| self.write_order_by(&mut context, out, query, order),
                ", ",
            );
        }
        self.write_limit_offset(context, out, query.options.row_cap(), query.options.offset);
    }

    /// Emit the row count of the query, over a sub-select when grouping, distinct or paging change the row set.
    fn write_count(&self, out: &mut String, query: &EntityQuery) {
        let mut context = Context::new(Fragment::SqlSelect, query.entity.is_view());
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT COUNT(*) FROM ");
        if query.counts_over_subquery() {
            out.push_str("(\n");
            self.write_select_body(&mut context, out, query);
            out.push_str("\n) AS ");
            self.write_identifier_quoted(&mut context, out, "counted");
        } else {
            self.write_from(&mut context.switch_fragment(Fragment::SqlSelectFrom), out, query);
            if let Some(condition) = query.where_condition
                && *condition != Condition::All
            {
                out.push_str("\nWHERE ");
                self.write_condition(
                    &mut context.switch_fragment(Fragment::SqlSelectWhere),
                    out,
                    query,
                    condition,
                );
            }
        }
        out.push(';');
    }

    /// Emit SELECT of `fields` for the record addressed by `key`.
    fn write_select_by_primary_key(&self, out: &mut String, key: &PrimaryKey, fields: &[&FieldDef]) {
        self.write_select_by_primary_keys(out, key.entity(), fields, std::slice::from_ref(key));
    }

    /// Emit SELECT of `fields` for every record addressed by `keys`.
    fn write_select_by_primary_keys(
        &self,
        out: &mut String,
        entity: &EntityDef,
        fields: &[&FieldDef],
        keys: &[PrimaryKey],
    ) {
        let mut context = Context::new(Fragment::SqlSelect, false);
        out.reserve(128 + fields.len() * 32 + keys.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT ");
        separated_by(
            out,
            fields,
            |out, field| {
                self.write_column_ref(&mut context, out, &entity.table, &field.column_name)
            },
            ", ",
        );
        out.push_str("\nFROM ");
        self.write_table_ref(
            &mut context.switch_fragment(Fragment::SqlSelectFrom),
            out,
            entity,
            "",
        );
        out.push_str("\nWHERE ");
        let mut context = context.switch_fragment(Fragment::SqlSelectWhere);
        let mut key_fields = entity.primary_key_fields();
        match (key_fields.next(), key_fields.next()) {
            (Some(field), None) if keys.len() > 1 => {
                self.write_column_ref(&mut context, out, &entity.table, &field.column_name);
                out.push_str(" IN (");
                separated_by(
                    out,
                    keys,
                    |out, key| {
                        self.write_value(
                            &mut context,
                            out,
                            key.get(field.name()).unwrap_or(&Value::Null),
                        )
                    },
                    ", ",
                );
                out.push(')');
            }
            _ => separated_by(
                out,
                keys,
                |out, key| {
                    possibly_parenthesized!(
                        out,
                        keys.len() > 1,
                        self.write_key_condition(&mut context, out, entity, key)
                    );
                },
                " OR ",
            ),
        }
        out.push(';');
    }

    /// Emit UPDATE of `fields` on the record addressed by the key fields of `value`.
    fn write_update(&self, out: &mut String, value: &EntityValue, fields: &[(&FieldDef, &Value)]) {
        let entity = value.entity();
        let mut context = Context::new(Fragment::SqlUpdateSet, false);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("UPDATE ");
        self.write_table_ref(&mut context, out, entity, "");
        out.push_str(" SET\n");
        separated_by(
            out,
            fields,
            |out, (field, v)| {
                self.write_identifier_quoted(&mut context, out, &field.column_name);
                out.push_str(" = ");
                self.write_value(&mut context, out, v);
            },
            ",\n",
        );
        out.push_str("\nWHERE ");
        self.write_key_condition(
            &mut context.switch_fragment(Fragment::SqlUpdateWhere),
            out,
            entity,
            value,
        );
        out.push(';');
    }

    /// Emit UPDATE of `fields_to_set` on every row matching the query condition.
    fn write_update_by_condition(
        &self,
        out: &mut String,
        query: &EntityQuery,
        fields_to_set: &BTreeMap<String, Value>,
    ) {
        let entity = query.entity;
        let mut context = Context::new(Fragment::SqlUpdateSet, false);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("UPDATE ");
        self.write_table_ref(&mut context, out, entity, "");
        out.push_str(" SET\n");
        separated_by(
            out,
            fields_to_set,
            |out, (name, v)| {
                let Some(field) = entity.get_field(name) else {
                    log::error!("Entity {} has no field `{}`", entity.name, name);
                    return;
                };
                self.write_identifier_quoted(&mut context, out, &field.column_name);
                out.push_str(" = ");
                self.write_value(&mut context, out, v);
            },
            ",\n",
        );
        if let Some(condition) = query.where_condition
            && *condition != Condition::All
        {
            out.push_str("\nWHERE ");
            self.write_condition(
                &mut context.switch_fragment(Fragment::SqlUpdateWhere),
                out,
                query,
                condition,
            );
        }
        out.push(';');
    }

    /// Emit DELETE of the record addressed by `key`.
    fn write_delete_by_primary_key(&self, out: &mut String, key: &PrimaryKey) {
        let entity = key.entity();
        let mut context = Context::new(Fragment::SqlDeleteFrom, false);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DELETE FROM ");
        self.write_table_ref(&mut context, out, entity, "");
        out.push_str("\nWHERE ");
        self.write_key_condition(
            &mut context.switch_fragment(Fragment::SqlDeleteFromWhere),
            out,
            entity,
            key,
        );
        out.push(';');
    }

    /// Emit DELETE of every row matching the query condition.
    fn write_delete_by_condition(&self, out: &mut String, query: &EntityQuery) {
        let mut context = Context::new(Fragment::SqlDeleteFrom, false);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DELETE FROM ");
        self.write_table_ref(&mut context, out, query.entity, "");
        if let Some(condition) = query.where_condition
            && *condition != Condition::All
        {
            out.push_str("\nWHERE ");
            self.write_condition(
                &mut context.switch_fragment(Fragment::SqlDeleteFromWhere),
                out,
                query,
                condition,
            );
        }
        out.push(';');
    }

    /// Emit the two hop select `value` -> `entity_one` -> `entity_two`, returning `entity_two` columns.
    #[allow(clippy::too_many_arguments)]
    fn write_select_multi_relation(
        &self,
        out: &mut String,
        value: &EntityValue,
        relation_one: &RelationDef,
        entity_one: &EntityDef,
        relation_two: &RelationDef,
        entity_two: &EntityDef,
        order_by: &[OrderBy],
    ) {
        const ONE: &str = "R1";
        const TWO: &str = "R2";
        let mut context = Context::new(Fragment::SqlSelect, true);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT ");
        separated_by(
            out,
            &entity_two.fields,
            |out, field| self.write_column_ref(&mut context, out, TWO, &field.column_name),
            ", ",
        );
        out.push_str("\nFROM ");
        let mut from = context.switch_fragment(Fragment::SqlSelectFrom);
        self.write_table_ref(&mut from, out, entity_one, ONE);
        out.push('\n');
        let mut join = context.switch_fragment(Fragment::SqlJoin);
        self.write_join_type(&mut join, out, false);
        out.push(' ');
        self.write_table_ref(&mut join, out, entity_two, TWO);
        out.push_str(" ON ");
        separated_by(
            out,
            &relation_two.key_maps,
            |out, key| {
                self.write_column_ref(&mut join, out, ONE, &column_of(entity_one, &key.field));
                out.push_str(" = ");
                self.write_column_ref(&mut join, out, TWO, &column_of(entity_two, &key.rel_field));
            },
            " AND ",
        );
        out.push_str("\nWHERE ");
        let mut filter = context.switch_fragment(Fragment::SqlSelectWhere);
        separated_by(
            out,
            &relation_one.key_maps,
            |out, key| {
                self.write_column_ref(&mut filter, out, ONE, &column_of(entity_one, &key.rel_field));
                out.push_str(" = ");
                self.write_value(&mut filter, out, value.get(&key.field).unwrap_or(&Value::Null));
            },
            " AND ",
        );
        if !order_by.is_empty() {
            out.push_str("\nORDER BY ");
            let mut order = context.switch_fragment(Fragment::SqlSelectOrderBy);
            separated_by(
                out,
                order_by,
                |out, v| {
                    self.write_column_ref(&mut order, out, TWO, &column_of(entity_two, &v.field));
                    self.write_order_suffix(&mut order, out, v);
                },
                ", ",
            );
        }
        out.push(';');
    }
}

fn column_of(entity: &EntityDef, field: &str) -> String {
    entity
        .get_field(field)
        .map(|f| f.column_name.to_string())
        .unwrap_or_else(|| field.to_string())
}

/// Fallback generic SQL writer (closest to PostgreSQL conventions).
#[derive(Default)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
