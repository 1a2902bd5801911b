//! Command dispatch against the keyspace.

use super::keyspace::Keyspace;
use super::protocol::Reply;

pub(crate) fn execute(args: &[Vec<u8>], keyspace: &Keyspace) -> Reply {
    let Some((name, rest)) = args.split_first() else {
        return Reply::Error("ERR empty command".to_string());
    };
    let name = String::from_utf8_lossy(name).to_ascii_lowercase();

    match (name.as_str(), rest) {
        ("ping", []) => Reply::Simple("PONG"),
        ("ping" | "echo", [message]) => Reply::Bulk(message.clone()),
        ("get", [key]) => keyspace.get(key).map_or(Reply::Nil, Reply::Bulk),
        ("set", [key, value]) => {
            keyspace.set(key, value);
            Reply::ok()
        }
        ("set", [_, _, ..]) => Reply::Error("ERR syntax error".to_string()),
        ("del", [_, ..]) => count(rest, |key| keyspace.remove(key)),
        ("exists", [_, ..]) => count(rest, |key| keyspace.contains(key)),
        ("select", [index]) if index.as_slice() == b"0" => Reply::ok(),
        ("select", [_]) => Reply::Error("ERR DB index is out of range".to_string()),
        // Client handshakes (SETINFO, SETNAME) are acknowledged and ignored.
        ("client", [_, ..]) => Reply::ok(),
        ("ping" | "echo" | "get" | "set" | "del" | "exists" | "select" | "client", _) => {
            Reply::Error(format!(
                "ERR wrong number of arguments for '{name}' command"
            ))
        }
        _ => Reply::Error(format!("ERR unknown command '{name}'")),
    }
}

fn count(keys: &[Vec<u8>], mut matches: impl FnMut(&[u8]) -> bool) -> Reply {
    let hits = keys.iter().filter(|key| matches(key)).count();
    Reply::Integer(i64::try_from(hits).unwrap_or(i64::MAX))
}
