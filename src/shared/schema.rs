diesel::table! {
    service_tickets (id) {
        id -> Uuid,
        ticket_number -> Int8,
        customer_name -> Varchar,
        customer_phone -> Varchar,
        phone_normalized -> Varchar,
        customer_email -> Nullable<Varchar>,
        language -> Varchar,
        device_type -> Varchar,
        device_model -> Nullable<Varchar>,
        issue_description -> Text,
        additional_notes -> Nullable<Text>,
        status -> Varchar,
        cost_proposal_approved -> Nullable<Bool>,
        diagnosis -> Nullable<Text>,
        final_cost -> Nullable<Varchar>,
        work_done_summary -> Nullable<Text>,
        internal_notes -> Nullable<Text>,
        is_hidden -> Bool,
        created_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
        customer_notified_at -> Nullable<Timestamptz>,
        picked_up_at -> Nullable<Timestamptz>,
        closed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    message_log (id) {
        id -> Uuid,
        ticket_id -> Nullable<Uuid>,
        channel -> Varchar,
        direction -> Varchar,
        from_address -> Varchar,
        to_address -> Varchar,
        subject -> Nullable<Varchar>,
        body -> Text,
        provider -> Varchar,
        provider_id -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(service_tickets, message_log);
