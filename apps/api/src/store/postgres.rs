use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::client::{Client, ClientSummary};
use crate::models::invoice::{Invoice, InvoiceFields, InvoiceStatus};
use crate::models::session::Session;
use crate::models::user::{NewUser, Plan, PlanCounts, User, UserFilter, UserPage};
use crate::store::{client_not_found, invoice_not_found, user_not_found, SendOutcome, Store};

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, whatsapp_number, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.whatsapp_number)
        .bind(new_user.is_admin)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("Email {} is already registered", new_user.email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        whatsapp_number: Option<&str>,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET name = $2, whatsapp_number = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(whatsapp_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| user_not_found(id))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        // sessions, clients and invoices go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<UserPage, AppError> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let per_page = filter.per_page.max(1);
        let page = filter.page.max(1);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::user_plan IS NULL OR plan = $2)
            "#,
        )
        .bind(pattern.as_deref())
        .bind(filter.plan)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::user_plan IS NULL OR plan = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(pattern.as_deref())
        .bind(filter.plan)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserPage {
            users,
            total,
            page,
            per_page,
        })
    }

    async fn recent_users(&self, limit: i64) -> Result<Vec<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn plan_counts(&self) -> Result<PlanCounts, AppError> {
        Ok(sqlx::query_as::<_, PlanCounts>(
            r#"
            SELECT COUNT(*) AS total_users,
                   COUNT(*) FILTER (WHERE plan = 'free') AS free_users,
                   COUNT(*) FILTER (WHERE plan = 'paid') AS paid_users
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }

    async fn set_plan(&self, id: Uuid, plan: Plan) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            "UPDATE users SET plan = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(plan)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn reset_invoice_count(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>(
            "UPDATE users SET invoice_count = 0, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        Ok(
            sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_client(
        &self,
        user_id: Uuid,
        client_name: &str,
        client_whatsapp: &str,
    ) -> Result<Client, AppError> {
        Ok(sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (id, user_id, client_name, client_whatsapp)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(client_name)
        .bind(client_whatsapp)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<ClientSummary>, AppError> {
        Ok(sqlx::query_as::<_, ClientSummary>(
            r#"
            SELECT c.*, COUNT(i.id) AS invoices_count
            FROM clients c
            LEFT JOIN invoices i ON i.client_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_client(
        &self,
        id: Uuid,
        client_name: &str,
        client_whatsapp: &str,
    ) -> Result<Client, AppError> {
        sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET client_name = $2, client_whatsapp = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(client_name)
        .bind(client_whatsapp)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| client_not_found(id))
    }

    async fn delete_client(&self, id: Uuid) -> Result<(), AppError> {
        // invoices.client_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(client_not_found(id));
        }
        Ok(())
    }

    async fn insert_invoice(
        &self,
        user_id: Uuid,
        fields: &InvoiceFields,
    ) -> Result<Invoice, AppError> {
        Ok(sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (id, user_id, client_id, amount, description, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'draft')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(fields.client_id)
        .bind(fields.amount)
        .bind(&fields.description)
        .bind(fields.due_date)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_invoices(
        &self,
        user_id: Uuid,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError> {
        Ok(sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE user_id = $1 AND ($2::invoice_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_invoice(&self, id: Uuid, fields: &InvoiceFields) -> Result<Invoice, AppError> {
        sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET client_id = $2, amount = $3, description = $4, due_date = $5, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fields.client_id)
        .bind(fields.amount)
        .bind(&fields.description)
        .bind(fields.due_date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| invoice_not_found(id))
    }

    async fn mark_invoice_paid(&self, id: Uuid) -> Result<Invoice, AppError> {
        sqlx::query_as::<_, Invoice>(
            "UPDATE invoices SET status = 'paid', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| invoice_not_found(id))
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(invoice_not_found(id));
        }
        Ok(())
    }

    async fn send_invoice(
        &self,
        id: Uuid,
        free_limit: i32,
        sent_at: DateTime<Utc>,
    ) -> Result<SendOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Lock the invoice row so two sends of the same invoice serialize
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| invoice_not_found(id))?;

        if invoice.status != InvoiceStatus::Draft {
            tx.commit().await?;
            return Ok(SendOutcome::Unchanged(invoice));
        }

        // 2. Conditional increment: the quota predicate is re-evaluated on the locked user row
        let invoice_count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users SET invoice_count = invoice_count + 1, updated_at = now()
            WHERE id = $1 AND (plan = 'paid' OR invoice_count < $2)
            RETURNING invoice_count
            "#,
        )
        .bind(invoice.user_id)
        .bind(free_limit)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(invoice_count) = invoice_count else {
            tx.rollback().await?;
            return Ok(SendOutcome::QuotaExceeded);
        };

        // 3. Flip the status
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET status = 'sent', sent_at = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(sent_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SendOutcome::Sent {
            invoice,
            invoice_count,
        })
    }
}
