use clap::{builder::NonEmptyStringValueParser, Arg, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_POLKA_KEY: &str = "polka-key";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-days";
pub const ARG_PASSWORD_COST: &str = "password-cost";
pub const ARG_PASSWORD_HASH_TIMEOUT: &str = "password-hash-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_secret_args(command);
    let command = with_token_args(command);
    with_password_args(command)
}

fn with_secret_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign access tokens")
                .env("CHIRPY_TOKEN_SECRET")
                .hide_env_values(true)
                .value_parser(NonEmptyStringValueParser::new())
                .required(true),
        )
        .arg(
            Arg::new(ARG_POLKA_KEY)
                .long(ARG_POLKA_KEY)
                .help("API key expected from the Polka payment webhook")
                .env("CHIRPY_POLKA_KEY")
                .hide_env_values(true)
                .value_parser(NonEmptyStringValueParser::new())
                .required(true),
        )
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long(ARG_ACCESS_TOKEN_TTL)
                .help("Access token TTL in seconds")
                .env("CHIRPY_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long(ARG_REFRESH_TOKEN_TTL)
                .help("Refresh token TTL in days")
                .env("CHIRPY_REFRESH_TOKEN_TTL_DAYS")
                .default_value("60")
                .value_parser(clap::value_parser!(i64).range(0..=3650)),
        )
}

fn with_password_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PASSWORD_COST)
                .long(ARG_PASSWORD_COST)
                .help("bcrypt work factor")
                .env("CHIRPY_PASSWORD_COST")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(4..=31)),
        )
        .arg(
            Arg::new(ARG_PASSWORD_HASH_TIMEOUT)
                .long(ARG_PASSWORD_HASH_TIMEOUT)
                .help("Upper bound for a single password hash or check, in seconds")
                .env("CHIRPY_PASSWORD_HASH_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
