use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder, Row as _, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        Filter, ProcedureArg, QuestionsWriteRepo, RepoError, Row, RowRange, Selection, TableStore,
    },
    domain::{
        entities::{NewQuestion, QuestionRecord},
        normalize::normalize_name,
        types::{Difficulty, Table},
    },
};

use super::{PostgresRepositories, map_sqlx_error, util::is_identifier};

const QUESTION_COLUMNS: &[&str] = &[
    "id",
    "category",
    "subject",
    "topic",
    "chapter",
    "difficulty",
    "prompt",
    "answer",
    "created_at",
];

fn table_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Questions => QUESTION_COLUMNS,
    }
}

fn checked_column(table: Table, column: &str) -> Result<(), RepoError> {
    if table_columns(table).contains(&column) {
        Ok(())
    } else {
        Err(RepoError::invalid_input(format!(
            "unknown column `{column}` on `{}`",
            table.as_str()
        )))
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64, RepoError> {
    i64::try_from(value)
        .map_err(|_| RepoError::invalid_input(format!("{what} exceeds supported range")))
}

fn push_filters<'q>(
    qb: &mut QueryBuilder<'q, Postgres>,
    table: Table,
    filters: &'q [Filter],
) -> Result<(), RepoError> {
    for filter in filters {
        checked_column(table, filter.column())?;
        match filter {
            Filter::EqIgnoreCase { column, value } => {
                qb.push(" AND LOWER(BTRIM(");
                qb.push(*column);
                qb.push(")) = LOWER(BTRIM(");
                qb.push_bind(value.as_str());
                qb.push("))");
            }
        }
    }
    Ok(())
}

fn push_procedure_arg<'q>(qb: &mut QueryBuilder<'q, Postgres>, value: &'q Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(flag) => {
            qb.push_bind(*flag);
        }
        Value::Number(number) => match number.as_i64() {
            Some(int) => {
                qb.push_bind(int);
            }
            None => {
                qb.push_bind(number.as_f64().unwrap_or_default());
            }
        },
        Value::String(text) => {
            qb.push_bind(text.as_str());
        }
        other => {
            qb.push_bind(Json(other));
        }
    }
}

fn into_row(value: Value) -> Result<Row, RepoError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RepoError::from_persistence(format!(
            "expected a JSON object row, got {other}"
        ))),
    }
}

#[derive(sqlx::FromRow)]
struct InsertedQuestionRow {
    id: Uuid,
    category: String,
    subject: String,
    topic: String,
    chapter: String,
    difficulty: Option<String>,
    prompt: String,
    created_at: OffsetDateTime,
}

impl From<InsertedQuestionRow> for QuestionRecord {
    fn from(row: InsertedQuestionRow) -> Self {
        Self {
            id: row.id,
            category: row.category,
            subject: row.subject,
            topic: row.topic,
            chapter_key: normalize_name(&row.chapter),
            chapter: row.chapter,
            difficulty: row.difficulty.as_deref().and_then(Difficulty::parse),
            prompt: row.prompt,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TableStore for PostgresRepositories {
    async fn select(&self, selection: &Selection, range: RowRange) -> Result<Vec<Row>, RepoError> {
        let table = selection.table;
        if selection.columns.is_empty() {
            return Err(RepoError::invalid_input("selection has no columns"));
        }

        let mut qb = QueryBuilder::<Postgres>::new("SELECT to_jsonb(t) AS row FROM (SELECT ");
        for (index, column) in selection.columns.iter().enumerate() {
            checked_column(table, column)?;
            if index > 0 {
                qb.push(", ");
            }
            qb.push(*column);
        }
        qb.push(" FROM ");
        qb.push(table.as_str());
        qb.push(" WHERE TRUE");
        push_filters(&mut qb, table, &selection.filters)?;

        for (index, column) in selection.order_by.iter().enumerate() {
            checked_column(table, column)?;
            qb.push(if index == 0 { " ORDER BY " } else { ", " });
            qb.push(*column);
        }

        qb.push(" LIMIT ");
        qb.push_bind(to_i64(range.limit, "limit")?);
        qb.push(" OFFSET ");
        qb.push_bind(to_i64(range.offset, "offset")?);
        qb.push(") t");

        let rows = qb
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row").map_err(map_sqlx_error)?;
                into_row(value)
            })
            .collect()
    }

    async fn call_procedure(
        &self,
        name: &str,
        args: &[ProcedureArg],
    ) -> Result<Vec<Row>, RepoError> {
        if !is_identifier(name) {
            return Err(RepoError::invalid_input(format!(
                "invalid procedure name `{name}`"
            )));
        }

        let mut qb = QueryBuilder::<Postgres>::new("SELECT to_jsonb(t) AS row FROM ");
        qb.push(name);
        qb.push("(");
        for (index, arg) in args.iter().enumerate() {
            if !is_identifier(arg.name) {
                return Err(RepoError::invalid_input(format!(
                    "invalid argument name `{}`",
                    arg.name
                )));
            }
            if index > 0 {
                qb.push(", ");
            }
            qb.push(arg.name);
            qb.push(" => ");
            push_procedure_arg(&mut qb, &arg.value);
        }
        qb.push(") AS t");

        let rows = qb
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row").map_err(map_sqlx_error)?;
                into_row(value)
            })
            .collect()
    }
}

#[async_trait]
impl QuestionsWriteRepo for PostgresRepositories {
    async fn insert_question(&self, question: NewQuestion) -> Result<QuestionRecord, RepoError> {
        let row = sqlx::query_as::<_, InsertedQuestionRow>(
            r#"
            INSERT INTO questions (category, subject, topic, chapter, difficulty, prompt, answer)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, category, subject, topic, chapter, difficulty, prompt, created_at
            "#,
        )
        .bind(&question.category)
        .bind(&question.subject)
        .bind(&question.topic)
        .bind(&question.chapter)
        .bind(question.difficulty.map(Difficulty::as_str))
        .bind(&question.prompt)
        .bind(&question.answer)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(QuestionRecord::from(row))
    }
}
