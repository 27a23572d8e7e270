use serde::Deserialize;

/// One page of a cursored id walk (`friends/ids`, `followers/ids`).
#[derive(Debug, Clone, Deserialize)]
pub struct IdPage {
    pub ids: Vec<i64>,
    pub next_cursor: i64,
    pub previous_cursor: i64,
}

impl IdPage {
    /// Cursor value requesting the first page of a walk.
    pub const FIRST: i64 = -1;

    /// The platform signals the final page with a zero `next_cursor`.
    pub fn is_last(&self) -> bool {
        self.next_cursor == 0
    }
}

/// A platform user, trimmed to the fields the engine reads.
#[derive(Debug, Clone, Deserialize)]
pub struct RoostUser {
    pub id: i64,
    pub screen_name: String,
}

/// A member list as returned by `lists/create`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoostList {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Wrapper for `lists/members` responses.
#[derive(Debug, Clone, Deserialize)]
pub struct MembersResponse {
    pub users: Vec<RoostUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_page_terminal_cursor() {
        let page: IdPage =
            serde_json::from_str(r#"{"ids":[3,1,2],"next_cursor":0,"previous_cursor":-7}"#)
                .unwrap();
        assert_eq!(page.ids, vec![3, 1, 2]);
        assert!(page.is_last());

        let more: IdPage =
            serde_json::from_str(r#"{"ids":[],"next_cursor":1300794057949,"previous_cursor":0}"#)
                .unwrap();
        assert!(!more.is_last());
    }

    #[test]
    fn members_response_ignores_unknown_fields() {
        let resp: MembersResponse = serde_json::from_str(
            r#"{"users":[{"id":9,"screen_name":"wren","followers_count":12}],"next_cursor":0}"#,
        )
        .unwrap();
        assert_eq!(resp.users.len(), 1);
        assert_eq!(resp.users[0].screen_name, "wren");
    }
}
