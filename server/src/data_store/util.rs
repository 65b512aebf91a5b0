use crate::scheduling::time_interval::ClockTime;
use diesel::backend::Backend;
use diesel::deserialize::FromSql;
use diesel::query_builder::bind_collector::RawBytesBindCollector;
use diesel::serialize::ToSql;

// A ClockTime is stored in its zero-padded textual `HH:MM` form, such that the lexical order of
// the database column equals the chronological order.

impl<DB> ToSql<diesel::sql_types::Text, DB> for ClockTime
where
    DB: diesel::backend::Backend,
    str: ToSql<diesel::sql_types::Text, DB>,
    for<'c> DB: Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value = self.to_string();
        <str as ToSql<diesel::sql_types::Text, DB>>::to_sql(&value, &mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Text, DB> for ClockTime
where
    DB: diesel::backend::Backend,
    String: FromSql<diesel::sql_types::Text, DB>,
{
    fn from_sql(
        bytes: <DB as diesel::backend::Backend>::RawValue<'_>,
    ) -> diesel::deserialize::Result<Self> {
        let x = String::from_sql(bytes)?;
        let time = x
            .parse()
            .map_err(|e| format!("Invalid time of day in database: {}", e))?;
        Ok(time)
    }
}
