use crate::storage::UserProfile;

/// Newline-delimited admin listing, one block per profile.
pub fn user_listing(profiles: &[UserProfile]) -> String {
    let mut message = String::from("Here's a list of all the users:\n\n");
    for (index, profile) in profiles.iter().enumerate() {
        message.push_str(&format!(
            "User {}:\nName: {}\nUsername: {}\nID: {}\nBirthday: {}\nEnrollment: {}\n\n",
            index + 1,
            profile.display_name,
            profile.username.as_deref().unwrap_or("-"),
            profile.chat_id,
            profile.birthday_long(),
            profile.enrollment.summary(),
        ));
    }
    message
}

/// The caller's own profile, for /account.
pub fn account_view(profile: &UserProfile) -> String {
    format!(
        "📋 Account Data:\n\n\
         👤 Name: {}\n\
         💻 Username: {}\n\
         🆔 User ID: {}\n\
         🎂 Birthday: {}\n\
         📚 Enrollment: {}",
        profile.display_name,
        profile.username.as_deref().unwrap_or("-"),
        profile.chat_id,
        profile.birthday_long(),
        profile.enrollment.summary(),
    )
}
