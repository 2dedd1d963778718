use super::{error, Error};

// krb5 table
impl Error {
    error!(KRB5_PARSE_MALFORMED, -1765328250, "Malformed representation of principal");
    error!(
        KRB5_CONFIG_NODEFREALM,
        -1765328160, "Configuration file does not specify default realm"
    );
}

// heim table
impl Error {
    error!(HEIM_ERR_EOF, -1980176635, "End of file");
}

// ovk (kadm5) table, base 43787520
impl Error {
    error!(KADM5_FAILURE, 43787520, "Operation failed for unspecified reason");
    error!(
        KADM5_AUTH_INSUFFICIENT,
        43787525, "Insufficient authorization for operation"
    );
    error!(KADM5_BAD_DB, 43787526, "Database inconsistency detected");
    error!(KADM5_DUP, 43787527, "Principal or policy already exists");
    error!(KADM5_UNK_PRINC, 43787532, "Principal does not exist");
    error!(KADM5_BAD_MASK, 43787534, "Invalid field mask for operation");
    error!(KADM5_BAD_PRINCIPAL, 43787538, "Invalid principal name");
    error!(KADM5_PASS_Q_TOOSHORT, 43787542, "Password is too short");
}
